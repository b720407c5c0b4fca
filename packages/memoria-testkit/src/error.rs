pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("MEMORIA_PG_DSN is not a valid Postgres DSN: {0}.")]
	InvalidDsn(sqlx::Error),

	#[error("No admin database ({tried}) accepted a connection: {source}.")]
	AdminUnavailable { tried: String, source: sqlx::Error },

	#[error("Failed to start a cleanup runtime: {0}.")]
	Runtime(#[from] std::io::Error),

	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
}
