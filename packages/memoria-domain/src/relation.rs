use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entry::{EntryKey, EntryType};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationDirection {
	/// Follow edges from source to target.
	Forward,
	/// Follow edges from target to source.
	Backward,
	#[default]
	Both,
}
impl RelationDirection {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Forward => "forward",
			Self::Backward => "backward",
			Self::Both => "both",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"forward" => Some(Self::Forward),
			"backward" => Some(Self::Backward),
			"both" => Some(Self::Both),
			_ => None,
		}
	}
}

/// Explicit typed relation between two entries, e.g. a guideline that `depends_on` a tool.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RelationEdge {
	pub source_type: EntryType,
	pub source_id: Uuid,
	pub target_type: EntryType,
	pub target_id: Uuid,
	pub relation_type: String,
}
impl RelationEdge {
	pub fn source(&self) -> EntryKey {
		EntryKey::new(self.source_type, self.source_id)
	}

	pub fn target(&self) -> EntryKey {
		EntryKey::new(self.target_type, self.target_id)
	}

	/// The endpoint reached when walking this edge away from `from` in `direction`.
	pub fn step_from(&self, from: EntryKey, direction: RelationDirection) -> Option<EntryKey> {
		let forward = self.source() == from;
		let backward = self.target() == from;

		match direction {
			RelationDirection::Forward if forward => Some(self.target()),
			RelationDirection::Backward if backward => Some(self.source()),
			RelationDirection::Both if forward => Some(self.target()),
			RelationDirection::Both if backward => Some(self.source()),
			_ => None,
		}
	}
}
