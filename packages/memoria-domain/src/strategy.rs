use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
	/// Substring matching over name and content.
	Like,
	Fts5,
	Semantic,
	Hybrid,
}
impl SearchStrategy {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Like => "like",
			Self::Fts5 => "fts5",
			Self::Semantic => "semantic",
			Self::Hybrid => "hybrid",
		}
	}

	pub fn uses_lexical(self) -> bool {
		matches!(self, Self::Fts5 | Self::Hybrid)
	}

	pub fn uses_semantic(self) -> bool {
		matches!(self, Self::Semantic | Self::Hybrid)
	}
}
impl fmt::Display for SearchStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
