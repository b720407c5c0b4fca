use reqwest::header::{InvalidHeaderName, InvalidHeaderValue};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider request failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("Provider returned malformed JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error("Invalid provider header: {message}")]
	InvalidHeader { message: String },
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// True when the HTTP client gave up waiting on the provider.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Transport(err) if err.is_timeout())
	}
}
impl From<InvalidHeaderName> for Error {
	fn from(err: InvalidHeaderName) -> Self {
		Self::InvalidHeader { message: err.to_string() }
	}
}
impl From<InvalidHeaderValue> for Error {
	fn from(err: InvalidHeaderValue) -> Self {
		Self::InvalidHeader { message: err.to_string() }
	}
}
