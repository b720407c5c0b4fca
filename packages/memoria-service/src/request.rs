use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use memoria_config::Config;
use memoria_domain::{EntryKey, EntryType, RelationDirection, Scope, time_serde};

use crate::{Error, Result};

/// Query request as accepted from callers.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
	#[serde(default)]
	pub search: Option<String>,
	/// Singular or plural entry type names.
	#[serde(default)]
	pub types: Option<Vec<String>>,
	#[serde(default)]
	pub scope: Option<Scope>,
	#[serde(default)]
	pub limit: Option<u32>,
	#[serde(default)]
	pub semantic_search: bool,
	#[serde(default)]
	pub use_fts5: bool,
	#[serde(default)]
	pub related_to: Option<RelatedTo>,
	#[serde(default, with = "time_serde::option")]
	pub at_time: Option<OffsetDateTime>,
	#[serde(default)]
	pub valid_during: Option<ValidDuring>,
	#[serde(default)]
	pub tags: Option<TagFilter>,
	#[serde(default)]
	pub compact: bool,
	#[serde(default)]
	pub telemetry: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedTo {
	#[serde(rename = "type")]
	pub entry_type: String,
	pub id: Uuid,
	#[serde(default)]
	pub relation: Option<String>,
	#[serde(default)]
	pub direction: Option<String>,
	#[serde(default)]
	pub depth: Option<u32>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ValidDuring {
	#[serde(with = "time_serde")]
	pub start: OffsetDateTime,
	#[serde(with = "time_serde")]
	pub end: OffsetDateTime,
}

/// `require` and `exclude` are hard filters; `include` only counts toward the tag-match term.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TagFilter {
	#[serde(default)]
	pub include: Vec<String>,
	#[serde(default)]
	pub require: Vec<String>,
	#[serde(default)]
	pub exclude: Vec<String>,
}
impl TagFilter {
	fn normalized(&self) -> Self {
		Self {
			include: normalize_tags(&self.include),
			require: normalize_tags(&self.require),
			exclude: normalize_tags(&self.exclude),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.include.is_empty() && self.require.is_empty() && self.exclude.is_empty()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSeed {
	pub key: EntryKey,
	pub relation: Option<String>,
	pub direction: RelationDirection,
	pub depth: u32,
}

/// A validated request. Everything downstream of RESOLVE reads this, never the raw request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuery {
	pub search: Option<String>,
	pub types: Vec<EntryType>,
	pub scope: Scope,
	pub limit: usize,
	pub semantic_search: bool,
	pub use_fts5: bool,
	pub related_to: Option<RelationSeed>,
	#[serde(with = "time_serde::option")]
	pub at_time: Option<OffsetDateTime>,
	pub valid_during: Option<ValidDuring>,
	pub tags: TagFilter,
	pub compact: bool,
	#[serde(skip)]
	pub telemetry: bool,
}
impl NormalizedQuery {
	/// Blake3 digest of the request fields that influence results.
	pub fn cache_key(&self) -> Result<String> {
		let raw = serde_json::to_vec(self).map_err(|err| Error::Validation {
			message: format!("Failed to encode cache key payload: {err}"),
		})?;

		Ok(blake3::hash(&raw).to_hex().to_string())
	}

	pub fn search_lowercase(&self) -> Option<String> {
		self.search.as_ref().map(|search| search.to_lowercase())
	}
}

impl QueryRequest {
	pub fn normalize(&self, cfg: &Config) -> Result<NormalizedQuery> {
		let search = self
			.search
			.as_deref()
			.map(str::trim)
			.filter(|search| !search.is_empty())
			.map(str::to_string);
		let types = normalize_types(self.types.as_deref())?;
		let scope = self.scope.clone().unwrap_or_default();

		if !scope.is_valid() {
			return Err(Error::Validation {
				message: format!(
					"Scope {} requires a non-empty id unless it is global.",
					scope.scope_type
				),
			});
		}

		let limit = match self.limit {
			Some(0) =>
				return Err(Error::Validation {
					message: "limit must be greater than zero.".to_string(),
				}),
			Some(limit) => limit.min(cfg.query.max_limit) as usize,
			None => cfg.query.default_limit as usize,
		};
		let related_to = self.related_to.as_ref().map(|raw| normalize_related(raw, cfg)).transpose()?;

		if let Some(window) = self.valid_during
			&& window.start > window.end
		{
			return Err(Error::Validation {
				message: "validDuring.start must not be after validDuring.end.".to_string(),
			});
		}

		Ok(NormalizedQuery {
			search,
			types,
			scope,
			limit,
			semantic_search: self.semantic_search,
			use_fts5: self.use_fts5,
			related_to,
			at_time: self.at_time,
			valid_during: self.valid_during,
			tags: self.tags.as_ref().map(TagFilter::normalized).unwrap_or_default(),
			compact: self.compact,
			telemetry: self.telemetry,
		})
	}
}

/// Parses type names, keeping request order and dropping repeats. No types means all of them.
fn normalize_types(raw: Option<&[String]>) -> Result<Vec<EntryType>> {
	let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
		return Ok(EntryType::ALL.to_vec());
	};
	let mut out = Vec::with_capacity(raw.len());

	for name in raw {
		let entry_type = EntryType::parse(name).ok_or_else(|| Error::Validation {
			message: format!("Unknown entry type {name:?}."),
		})?;

		if !out.contains(&entry_type) {
			out.push(entry_type);
		}
	}

	Ok(out)
}

fn normalize_related(raw: &RelatedTo, cfg: &Config) -> Result<RelationSeed> {
	let entry_type = EntryType::parse(&raw.entry_type).ok_or_else(|| Error::Validation {
		message: format!("Unknown relatedTo.type {:?}.", raw.entry_type),
	})?;
	let direction = match raw.direction.as_deref() {
		Some(direction) => RelationDirection::parse(direction).ok_or_else(|| Error::Validation {
			message: "relatedTo.direction must be one of forward, backward, or both.".to_string(),
		})?,
		None => RelationDirection::parse(&cfg.relations.direction).unwrap_or_default(),
	};
	let depth = match raw.depth {
		Some(0) =>
			return Err(Error::Validation {
				message: "relatedTo.depth must be greater than zero.".to_string(),
			}),
		Some(depth) => depth.min(cfg.relations.max_depth),
		None => cfg.relations.max_depth,
	};
	let relation = raw
		.relation
		.as_deref()
		.map(str::trim)
		.filter(|relation| !relation.is_empty())
		.map(str::to_string);

	Ok(RelationSeed { key: EntryKey::new(entry_type, raw.id), relation, direction, depth })
}

fn normalize_tags(tags: &[String]) -> Vec<String> {
	let mut out: Vec<String> = tags
		.iter()
		.map(|tag| tag.trim().to_lowercase())
		.filter(|tag| !tag.is_empty())
		.collect();

	out.sort();
	out.dedup();

	out
}
