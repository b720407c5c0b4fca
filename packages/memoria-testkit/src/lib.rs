//! Throwaway Postgres databases and seed rows for storage tests.

mod error;
pub mod seed;

pub use error::{Error, Result};

use std::{env, str::FromStr, thread};

use sqlx::{
	ConnectOptions, Connection,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

const DSN_VAR: &str = "MEMORIA_PG_DSN";
/// Databases tried, in order, for `CREATE DATABASE` and `DROP DATABASE`.
const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

pub fn env_dsn() -> Option<String> {
	env::var(DSN_VAR).ok().filter(|dsn| !dsn.trim().is_empty())
}

/// A uniquely named database on the server `MEMORIA_PG_DSN` points at.
///
/// Call `cleanup` at the end of a test. A database still alive at drop time is removed from a
/// helper thread so a failing assertion does not leak it.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin: Admin,
	dropped: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base = PgConnectOptions::from_str(base_dsn).map_err(Error::InvalidDsn)?;
		let admin = Admin::locate(&base).await?;
		let name = format!("memoria_test_{}", Uuid::new_v4().simple());

		admin.run(&format!(r#"CREATE DATABASE "{name}""#)).await?;

		let dsn = base.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin, dropped: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.admin.drop_database(&self.name).await?;

		self.dropped = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.dropped {
			return;
		}

		let name = std::mem::take(&mut self.name);
		let admin = self.admin.clone();
		let handle = thread::spawn(move || {
			let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build();
			let outcome = match runtime {
				Ok(runtime) => runtime.block_on(admin.drop_database(&name)),
				Err(err) => Err(Error::Runtime(err)),
			};

			if let Err(err) = outcome {
				eprintln!("Failed to drop test database {name}: {err}.");
			}
		});

		if handle.join().is_err() {
			eprintln!("Test database cleanup thread panicked.");
		}
	}
}

/// Connection settings for a maintenance database on the same server.
#[derive(Clone)]
struct Admin {
	options: PgConnectOptions,
}
impl Admin {
	async fn locate(base: &PgConnectOptions) -> Result<Self> {
		let mut last = None;

		for database in ADMIN_DATABASES {
			let options = base.clone().database(database);

			match PgConnection::connect_with(&options).await {
				Ok(conn) => {
					let _ = conn.close().await;

					return Ok(Self { options });
				},
				Err(err) => last = Some(err),
			}
		}

		Err(Error::AdminUnavailable {
			tried: ADMIN_DATABASES.join(", "),
			source: last.unwrap_or(sqlx::Error::PoolClosed),
		})
	}

	async fn run(&self, sql: &str) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.options).await?;

		sqlx::raw_sql(sql).execute(&mut conn).await?;

		Ok(())
	}

	async fn drop_database(&self, name: &str) -> Result<()> {
		let mut conn = PgConnection::connect_with(&self.options).await?;

		// Open pool connections would block the drop.
		sqlx::query(
			"SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
			 WHERE datname = $1 AND pid <> pg_backend_pid()",
		)
		.bind(name)
		.execute(&mut conn)
		.await?;
		sqlx::raw_sql(&format!(r#"DROP DATABASE IF EXISTS "{name}""#)).execute(&mut conn).await?;

		Ok(())
	}
}
