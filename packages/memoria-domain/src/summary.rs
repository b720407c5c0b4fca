use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{entry::EntryType, scope::ScopeType};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
	Summary,
	Entry(EntryType),
}
impl MemberType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Summary => "summary",
			Self::Entry(entry_type) => entry_type.as_str(),
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		if raw.trim().eq_ignore_ascii_case("summary") {
			return Some(Self::Summary);
		}

		EntryType::parse(raw).map(Self::Entry)
	}
}

/// Node of the precomputed summary hierarchy. Level 0 summarises entries directly; every higher
/// level summarises the level below it.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
	pub id: Uuid,
	pub scope_type: ScopeType,
	pub scope_id: Option<String>,
	pub hierarchy_level: u32,
	pub parent_summary_id: Option<Uuid>,
	pub title: String,
	#[serde(skip)]
	pub embedding: Vec<f32>,
	pub member_count: u32,
	pub access_count: u64,
	#[serde(default, with = "crate::time_serde::option")]
	pub last_accessed_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMember {
	pub summary_id: Uuid,
	pub member_type: MemberType,
	pub member_id: Uuid,
	pub contribution_score: f32,
}
