use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::entry::EntryType;

const DEBUG_TERMS: [&str; 14] = [
	"error",
	"errors",
	"fail",
	"failed",
	"failing",
	"failure",
	"bug",
	"crash",
	"exception",
	"panic",
	"broken",
	"traceback",
	"debug",
	"fix",
];
const HOW_TO_PREFIXES: [&str; 7] =
	["how to", "how do", "how can", "how should", "steps to", "best way", "what is the best way"];
const HOW_TO_TERMS: [&str; 6] = ["guide", "convention", "conventions", "setup", "configure", "workflow"];
const LOOKUP_PREFIXES: [&str; 9] =
	["what", "which", "who", "where", "when", "define", "list", "show", "find"];
const QUESTION_PREFIXES: [&str; 6] =
	["how do i ", "how can i ", "how to ", "what is ", "what are ", "where is "];
const STOP_WORDS: [&str; 18] = [
	"a", "an", "and", "are", "do", "does", "for", "i", "in", "is", "it", "of", "on", "or", "the",
	"to", "we", "with",
];

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
	Lookup,
	HowTo,
	Debug,
}
impl QueryIntent {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lookup => "lookup",
			Self::HowTo => "how_to",
			Self::Debug => "debug",
		}
	}

	/// Entry type that answers this kind of question best.
	pub fn favored_entry_type(self) -> EntryType {
		match self {
			Self::Lookup => EntryType::Knowledge,
			Self::HowTo => EntryType::Guideline,
			Self::Debug => EntryType::Experience,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryRewrite {
	/// Normalized query text handed to the lexical and semantic searches.
	pub text: String,
	pub terms: Vec<String>,
	pub intent: Option<QueryIntent>,
}

pub fn rewrite_query(query: &str, max_terms: usize, detect: bool) -> QueryRewrite {
	let normalized = normalize_query(query);
	let stripped = strip_question_prefix(&normalized);
	let text = if stripped.is_empty() { normalized.clone() } else { stripped.to_string() };
	let terms = search_terms(&text, max_terms);
	let intent = if detect { detect_intent(&normalized) } else { None };

	QueryRewrite { text, terms, intent }
}

/// Collapses whitespace and trims trailing question marks.
pub fn normalize_query(query: &str) -> String {
	let collapsed = query.split_whitespace().collect::<Vec<_>>().join(" ");

	collapsed.trim_end_matches('?').trim().to_string()
}

pub fn search_terms(text: &str, max_terms: usize) -> Vec<String> {
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for word in text.unicode_words() {
		if out.len() >= max_terms {
			break;
		}

		let lower = word.to_lowercase();

		if lower.chars().count() < 2 || STOP_WORDS.contains(&lower.as_str()) {
			continue;
		}
		if seen.insert(lower.clone()) {
			out.push(lower);
		}
	}

	out
}

/// Keyword rules, checked debug first, then how-to, then lookup.
pub fn detect_intent(query: &str) -> Option<QueryIntent> {
	let lower = query.trim().to_lowercase();

	if lower.is_empty() {
		return None;
	}

	let words: Vec<&str> = lower.unicode_words().collect();

	if words.iter().any(|word| DEBUG_TERMS.contains(word))
		|| lower.contains("not working")
		|| lower.contains("doesn't work")
		|| lower.contains("stack trace")
	{
		return Some(QueryIntent::Debug);
	}
	if HOW_TO_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
		|| words.iter().any(|word| HOW_TO_TERMS.contains(word))
	{
		return Some(QueryIntent::HowTo);
	}
	if words.first().map(|first| LOOKUP_PREFIXES.contains(first)).unwrap_or(false) {
		return Some(QueryIntent::Lookup);
	}

	None
}

fn strip_question_prefix(query: &str) -> &str {
	let lower = query.to_lowercase();

	for prefix in QUESTION_PREFIXES {
		if lower.starts_with(prefix) && query.is_char_boundary(prefix.len()) {
			return query[prefix.len()..].trim();
		}
	}

	query
}
