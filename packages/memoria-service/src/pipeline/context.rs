use std::collections::{BTreeMap, HashMap, HashSet};

use time::OffsetDateTime;
use uuid::Uuid;

use memoria_domain::{
	EntityMatch, EntrySnapshot, EntryType, QueryRewrite, ScopeLevel, SearchStrategy,
};

use crate::{
	Error, NormalizedQuery, Result,
	collaborators::{AdaptiveSignal, FeedbackCounts},
	pipeline::{Stage, StageSet, telemetry::Telemetry},
};

/// Candidate ids grouped by entry type.
pub type IdSets = HashMap<EntryType, HashSet<Uuid>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SemanticSource {
	Vector,
	Hierarchical,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SemanticScore {
	pub entry_type: EntryType,
	/// Similarity in `0.0..=1.0`.
	pub score: f64,
	pub source: SemanticSource,
}

/// The unit the scorer consumes.
#[derive(Clone, Debug)]
pub struct FilteredCandidate {
	pub entry: EntrySnapshot,
	/// Position of the entry's scope in the chain; 0 is the requested scope.
	pub scope_index: usize,
	pub tags: Vec<String>,
	pub text_matched: bool,
	pub matching_tag_count: usize,
	pub has_explicit_relation: bool,
}

#[derive(Clone, Debug)]
pub struct RankedEntry {
	pub entry: EntrySnapshot,
	pub tags: Vec<String>,
	pub score: f64,
}

/// State of one query as it moves through the stages.
///
/// `Option` fields are unset until their stage runs. Unset candidate sets mean "no constraint",
/// which is different from a set that is present but empty.
#[derive(Clone, Debug)]
pub struct PipelineContext {
	pub params: NormalizedQuery,
	/// Fixed at construction so every time-dependent term sees the same instant.
	pub now: OffsetDateTime,
	pub scope_chain: Vec<ScopeLevel>,
	pub search_strategy: Option<SearchStrategy>,
	pub rewrite: Option<QueryRewrite>,
	pub query_embedding: Option<Vec<f32>>,
	pub hierarchical_ids: Option<IdSets>,
	pub semantic_scores: Option<HashMap<Uuid, SemanticScore>>,
	pub fts_match_ids: Option<IdSets>,
	pub fts_scores: Option<HashMap<Uuid, f64>>,
	pub related_ids: Option<IdSets>,
	pub fetched_entries: Option<BTreeMap<EntryType, Vec<EntrySnapshot>>>,
	pub entity_matches: Option<HashMap<Uuid, EntityMatch>>,
	pub tags: Option<HashMap<Uuid, Vec<String>>>,
	pub filtered: Option<BTreeMap<EntryType, Vec<FilteredCandidate>>>,
	pub feedback: Option<HashMap<Uuid, FeedbackCounts>>,
	pub adaptive: Option<HashMap<Uuid, AdaptiveSignal>>,
	pub results: Vec<RankedEntry>,
	/// Scored candidates before overscan truncation. `None` when no stage counted them.
	pub total_candidates: Option<usize>,
	pub completed_stages: StageSet,
	pub telemetry: Option<Telemetry>,
	pub cache_key: Option<String>,
	pub cache_hit: bool,
}
impl PipelineContext {
	pub fn new(params: NormalizedQuery, now: OffsetDateTime) -> Self {
		Self {
			params,
			now,
			scope_chain: Vec::new(),
			search_strategy: None,
			rewrite: None,
			query_embedding: None,
			hierarchical_ids: None,
			semantic_scores: None,
			fts_match_ids: None,
			fts_scores: None,
			related_ids: None,
			fetched_entries: None,
			entity_matches: None,
			tags: None,
			filtered: None,
			feedback: None,
			adaptive: None,
			results: Vec::new(),
			total_candidates: None,
			completed_stages: StageSet::default(),
			telemetry: None,
			cache_key: None,
			cache_hit: false,
		}
	}

	/// Text handed to the search engines: the rewritten query when REWRITE produced one.
	pub fn search_text(&self) -> Option<&str> {
		self.rewrite
			.as_ref()
			.map(|rewrite| rewrite.text.as_str())
			.filter(|text| !text.is_empty())
			.or(self.params.search.as_deref())
	}

	pub fn has_search(&self) -> bool {
		self.params.search.is_some()
	}

	pub fn strategy(&self) -> SearchStrategy {
		self.search_strategy.unwrap_or(SearchStrategy::Like)
	}

	pub fn scope_index_of(&self, entry: &EntrySnapshot) -> Option<usize> {
		memoria_domain::scope_index(&self.scope_chain, entry.scope_type, entry.scope_id.as_deref())
	}

	/// Size of the most advanced candidate collection, for stage telemetry.
	pub fn working_set_size(&self) -> Option<usize> {
		if self.completed_stages.contains(Stage::Score) {
			return Some(self.results.len());
		}
		if let Some(filtered) = &self.filtered {
			return Some(filtered.values().map(Vec::len).sum());
		}
		if let Some(fetched) = &self.fetched_entries {
			return Some(fetched.values().map(Vec::len).sum());
		}

		None
	}
}

/// Returns `ctx` with `stage` recorded as complete. Callers holding an earlier copy keep seeing
/// the old set.
pub fn mark_stage_completed(mut ctx: PipelineContext, stage: Stage) -> PipelineContext {
	ctx.completed_stages = ctx.completed_stages.with(stage);

	ctx
}

pub fn validate_stage_prerequisites(ctx: &PipelineContext, stage: Stage) -> Result<()> {
	for missing in stage.prerequisites() {
		if !ctx.completed_stages.contains(*missing) {
			return Err(Error::StageDependency { stage, missing: *missing });
		}
	}

	Ok(())
}

pub(crate) fn id_sets_len(sets: &IdSets) -> usize {
	sets.values().map(HashSet::len).sum()
}

pub(crate) fn id_sets_contains(sets: &IdSets, entry_type: EntryType, id: Uuid) -> bool {
	sets.get(&entry_type).map(|ids| ids.contains(&id)).unwrap_or(false)
}
