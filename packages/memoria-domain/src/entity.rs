use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entry::EntrySnapshot;

const ENTITY_PATTERNS: [&str; 5] = [
	// Quoted phrases.
	r#""([^"]{2,})"|'([^']{2,})'|`([^`]{2,})`"#,
	// Dotted, namespaced, or path-like identifiers.
	r"\b([A-Za-z_][A-Za-z0-9_]*(?:(?:\.|::|/|-)[A-Za-z0-9_]+)+)\b",
	// snake_case identifiers.
	r"\b([a-z0-9]+(?:_[a-z0-9]+)+)\b",
	// CamelCase identifiers.
	r"\b([A-Z][a-z0-9]+(?:[A-Z][a-z0-9]*)+)\b",
	// Capitalized words.
	r"\b([A-Z][A-Za-z0-9]{2,})\b",
];
const IGNORED_CAPITALIZED: [&str; 12] =
	["How", "What", "Which", "Who", "Where", "When", "Why", "The", "Can", "Should", "Does", "Show"];

static ENTITY_REGEXES: LazyLock<Vec<Regex>> =
	LazyLock::new(|| ENTITY_PATTERNS.iter().filter_map(|pattern| Regex::new(pattern).ok()).collect());

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityMatch {
	Partial,
	Exact,
}

/// Named entities mentioned in a query, in first-seen order, deduplicated case-insensitively.
pub fn extract_entities(query: &str) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for regex in ENTITY_REGEXES.iter() {
		for captures in regex.captures_iter(query) {
			let Some(found) = captures.iter().skip(1).flatten().next() else {
				continue;
			};
			let entity = found.as_str().trim();

			if entity.is_empty() || IGNORED_CAPITALIZED.contains(&entity) {
				continue;
			}
			if seen.insert(entity.to_lowercase()) {
				out.push(entity.to_string());
			}
		}
	}

	out
}

/// Strongest match of any entity against the entry: equal to the name is exact, mentioned in the
/// name or content is partial.
pub fn match_entities(entities: &[String], entry: &EntrySnapshot) -> Option<EntityMatch> {
	if entities.is_empty() {
		return None;
	}

	let name = entry.name.to_lowercase();
	let content = entry.content.to_lowercase();
	let mut best = None;

	for entity in entities {
		let entity = entity.to_lowercase();

		if name == entity {
			return Some(EntityMatch::Exact);
		}
		if name.contains(&entity) || content.contains(&entity) {
			best = Some(EntityMatch::Partial);
		}
	}

	best
}
