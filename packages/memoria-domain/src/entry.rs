use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::scope::ScopeType;

const COMPACT_FIELDS: [&str; 4] = ["name", "title", "category", "level"];

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
	Tool,
	Guideline,
	Knowledge,
	Experience,
}
impl EntryType {
	pub const ALL: [Self; 4] = [Self::Tool, Self::Guideline, Self::Knowledge, Self::Experience];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Tool => "tool",
			Self::Guideline => "guideline",
			Self::Knowledge => "knowledge",
			Self::Experience => "experience",
		}
	}

	/// Collection name used by query requests (`tools`, `guidelines`, ...).
	pub fn plural(self) -> &'static str {
		match self {
			Self::Tool => "tools",
			Self::Guideline => "guidelines",
			Self::Knowledge => "knowledge",
			Self::Experience => "experiences",
		}
	}

	/// Accepts either the singular entry name or the plural collection name.
	pub fn parse(raw: &str) -> Option<Self> {
		let normalized = raw.trim().to_ascii_lowercase();

		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == normalized || kind.plural() == normalized)
	}
}
impl fmt::Display for EntryType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct EntryKey {
	pub entry_type: EntryType,
	pub id: Uuid,
}
impl EntryKey {
	pub fn new(entry_type: EntryType, id: Uuid) -> Self {
		Self { entry_type, id }
	}
}

/// Current-version payload of an entry. Always a JSON object; the ranking code never looks
/// inside it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct EntryPayload(Map<String, Value>);
impl EntryPayload {
	pub fn new(value: Value) -> Option<Self> {
		match value {
			Value::Object(map) => Some(Self(map)),
			Value::Null => Some(Self::default()),
			_ => None,
		}
	}

	pub fn as_map(&self) -> &Map<String, Value> {
		&self.0
	}

	pub fn to_value(&self) -> Value {
		Value::Object(self.0.clone())
	}

	pub fn compact(&self) -> Value {
		let mut out = Map::new();

		for field in COMPACT_FIELDS {
			if let Some(value) = self.0.get(field) {
				out.insert(field.to_string(), value.clone());
			}
		}

		Value::Object(out)
	}
}
impl TryFrom<Value> for EntryPayload {
	type Error = String;

	fn try_from(value: Value) -> Result<Self, Self::Error> {
		Self::new(value).ok_or_else(|| "Entry payload must be a JSON object.".to_string())
	}
}
impl From<EntryPayload> for Value {
	fn from(payload: EntryPayload) -> Self {
		Value::Object(payload.0)
	}
}

/// Read-only view of one tool, guideline, knowledge entry, or experience at its current version.
#[derive(Clone, Debug)]
pub struct EntrySnapshot {
	pub id: Uuid,
	pub entry_type: EntryType,
	pub scope_type: ScopeType,
	pub scope_id: Option<String>,
	pub name: String,
	pub content: String,
	pub category: Option<String>,
	/// Guideline priority in `0..=100`.
	pub priority: Option<i32>,
	/// Experience level (`case` or `strategy`).
	pub level: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub valid_from: Option<OffsetDateTime>,
	pub valid_until: Option<OffsetDateTime>,
	pub payload: EntryPayload,
}
impl EntrySnapshot {
	pub fn key(&self) -> EntryKey {
		EntryKey::new(self.entry_type, self.id)
	}

	/// Case-insensitive substring match over name and content. `needle` must already be lowercase.
	pub fn contains_text(&self, needle: &str) -> bool {
		if needle.is_empty() {
			return false;
		}

		self.name.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
	}

	pub fn valid_at(&self, at: OffsetDateTime) -> bool {
		if self.created_at > at {
			return false;
		}
		if let Some(from) = self.valid_from
			&& from > at
		{
			return false;
		}
		if let Some(until) = self.valid_until
			&& until <= at
		{
			return false;
		}

		true
	}

	pub fn overlaps(&self, start: OffsetDateTime, end: OffsetDateTime) -> bool {
		let from = self.valid_from.unwrap_or(self.created_at);

		if from > end {
			return false;
		}

		self.valid_until.map(|until| until > start).unwrap_or(true)
	}
}
