use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema};

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &memoria_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self, vector_dim: u32) -> Result<()> {
		let sql = schema::render_schema(vector_dim);
		let lock_id: i64 = 6_414_923;
		// Advisory locks are per connection; the transaction keeps the lock on one connection.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		let statements =
			sql.split(';').map(str::trim).filter(|statement| !statement.is_empty()).collect::<Vec<_>>();

		for statement in &statements {
			sqlx::query(statement).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		tracing::info!(vector_dim, statements = statements.len(), "Schema ensured.");

		Ok(())
	}
}
