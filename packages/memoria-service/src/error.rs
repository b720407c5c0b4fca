use crate::pipeline::Stage;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Stage {stage} requires {missing} to complete first.")]
	StageDependency { stage: Stage, missing: Stage },
	#[error("{collaborator} is unavailable: {message}")]
	CollaboratorUnavailable { collaborator: &'static str, message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("{operation} timed out.")]
	Timeout { operation: &'static str },
	#[error("Query deadline exceeded; partial results unavailable.")]
	DeadlineExceeded,
	#[error("Query was cancelled.")]
	Cancelled,
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
}
impl Error {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::DeadlineExceeded | Self::Timeout { .. })
	}

	/// Errors a stage may absorb by degrading instead of failing the request.
	pub fn is_degradable(&self) -> bool {
		matches!(self, Self::CollaboratorUnavailable { .. } | Self::Timeout { .. } | Self::Provider { .. })
	}
}
impl From<memoria_storage::Error> for Error {
	fn from(err: memoria_storage::Error) -> Self {
		match err {
			memoria_storage::Error::InvalidArgument(message) => Self::Validation { message },
			memoria_storage::Error::NotFound(message) => Self::NotFound { message },
			memoria_storage::Error::Qdrant(inner) => Self::CollaboratorUnavailable {
				collaborator: "vector index",
				message: inner.to_string(),
			},
			other => Self::Storage { message: other.to_string() },
		}
	}
}
impl From<memoria_providers::Error> for Error {
	fn from(err: memoria_providers::Error) -> Self {
		if err.is_timeout() {
			return Self::Timeout { operation: "provider call" };
		}

		Self::Provider { message: err.to_string() }
	}
}
