use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
	Global,
	Org,
	Project,
	Session,
}
impl ScopeType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Global => "global",
			Self::Org => "org",
			Self::Project => "project",
			Self::Session => "session",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"global" => Some(Self::Global),
			"org" => Some(Self::Org),
			"project" => Some(Self::Project),
			"session" => Some(Self::Session),
			_ => None,
		}
	}
}
impl fmt::Display for ScopeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
	#[serde(rename = "type")]
	pub scope_type: ScopeType,
	#[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
	pub scope_id: Option<String>,
	/// Walk outward to the enclosing scopes (project → org → global).
	#[serde(default = "default_inherit")]
	pub inherit: bool,
}
impl Scope {
	pub fn global() -> Self {
		Self { scope_type: ScopeType::Global, scope_id: None, inherit: true }
	}

	pub fn new(scope_type: ScopeType, scope_id: impl Into<String>) -> Self {
		Self { scope_type, scope_id: Some(scope_id.into()), inherit: true }
	}

	/// Global has no id; every other scope must carry a non-empty one.
	pub fn is_valid(&self) -> bool {
		let has_id = self.scope_id.as_deref().map(|id| !id.trim().is_empty()).unwrap_or(false);

		match self.scope_type {
			ScopeType::Global => !has_id,
			_ => has_id,
		}
	}
}
impl Default for Scope {
	fn default() -> Self {
		Self::global()
	}
}

/// One link of a resolved scope chain. `depth` counts hops outward from the requested scope and
/// `breadth` is the length of the chain the level belongs to.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeLevel {
	pub scope_type: ScopeType,
	pub scope_id: Option<String>,
	pub depth: u32,
	pub breadth: u32,
}
impl ScopeLevel {
	pub fn matches(&self, scope_type: ScopeType, scope_id: Option<&str>) -> bool {
		self.scope_type == scope_type && self.scope_id.as_deref() == scope_id
	}
}

pub fn scope_index(chain: &[ScopeLevel], scope_type: ScopeType, scope_id: Option<&str>) -> Option<usize> {
	chain.iter().position(|level| level.matches(scope_type, scope_id))
}

fn default_inherit() -> bool {
	true
}
