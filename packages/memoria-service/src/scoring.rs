//! Deterministic multi-feature scoring.
//!
//! Every term is independent and additive. A term whose feature is disabled or whose input is
//! missing contributes exactly zero.

use std::{cmp::Ordering, collections::HashMap};

use time::OffsetDateTime;
use uuid::Uuid;

use memoria_config::{Scoring, ScoringProximity, ScoringRecency};
use memoria_domain::{EntityMatch, EntryType, QueryIntent};

use crate::{
	collaborators::{AdaptiveSignal, FeedbackCounts},
	pipeline::{FilteredCandidate, PipelineContext, RankedEntry, SemanticScore},
};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Read-only view of every signal the scorer consults.
pub struct ScoringInputs<'a> {
	pub cfg: &'a Scoring,
	pub now: OffsetDateTime,
	pub chain_len: usize,
	pub semantic: Option<&'a HashMap<Uuid, SemanticScore>>,
	pub fts: Option<&'a HashMap<Uuid, f64>>,
	pub intent: Option<QueryIntent>,
	pub feedback: Option<&'a HashMap<Uuid, FeedbackCounts>>,
	pub entities: Option<&'a HashMap<Uuid, EntityMatch>>,
	pub adaptive: Option<&'a HashMap<Uuid, AdaptiveSignal>>,
}
impl<'a> ScoringInputs<'a> {
	pub fn from_context(ctx: &'a PipelineContext, cfg: &'a Scoring) -> Self {
		Self {
			cfg,
			now: ctx.now,
			chain_len: ctx.scope_chain.len(),
			semantic: ctx.semantic_scores.as_ref(),
			fts: ctx.fts_scores.as_ref(),
			intent: ctx.rewrite.as_ref().and_then(|rewrite| rewrite.intent),
			feedback: ctx.feedback.as_ref(),
			entities: ctx.entity_matches.as_ref(),
			adaptive: ctx.adaptive.as_ref(),
		}
	}
}

pub fn score_candidate(candidate: &FilteredCandidate, inputs: &ScoringInputs<'_>) -> f64 {
	let weights = &inputs.cfg.weights;
	let entry = &candidate.entry;
	let mut score = 0.0;

	if candidate.has_explicit_relation {
		score += weights.explicit_relation;
	}

	score += weights.tag_match * candidate.matching_tag_count as f64;
	score += weights.scope_proximity
		* proximity(&inputs.cfg.proximity, candidate.scope_index, inputs.chain_len);

	match inputs.fts.and_then(|scores| scores.get(&entry.id)) {
		Some(relevance) => score += weights.text_match * relevance,
		None if candidate.text_matched => score += weights.text_match,
		None => {},
	}

	if entry.entry_type == EntryType::Guideline
		&& let Some(priority) = entry.priority
	{
		score += weights.priority_max * (f64::from(priority.clamp(0, 100)) / 100.0);
	}
	if let Some(semantic) = inputs.semantic.and_then(|scores| scores.get(&entry.id)) {
		score += weights.semantic_max * semantic.score;
	}

	score += weights.recency_max * recency(&inputs.cfg.recency, age_days(inputs.now, entry.created_at));

	if let Some(intent) = inputs.intent
		&& intent.favored_entry_type() == entry.entry_type
	{
		score += weights.intent_boost;
	}
	if inputs.cfg.feedback.enabled
		&& let Some(counts) = inputs.feedback.and_then(|feedback| feedback.get(&entry.id))
	{
		score += feedback_adjustment(inputs.cfg, counts);
	}
	if inputs.cfg.entity.enabled
		&& let Some(found) = inputs.entities.and_then(|entities| entities.get(&entry.id))
	{
		score += match found {
			EntityMatch::Exact => inputs.cfg.entity.exact_boost,
			EntityMatch::Partial => inputs.cfg.entity.partial_boost,
		};
	}
	if inputs.cfg.smart_priority.enabled
		&& let Some(signal) = inputs.adaptive.and_then(|adaptive| adaptive.get(&entry.id))
	{
		score += smart_priority(inputs.cfg, signal);
	}

	score
}

/// Scores every candidate, sorts them into the final total order, and keeps the overscan pool.
/// Returns the pool and the number of candidates scored before truncation.
pub fn rank_candidates<'c>(
	candidates: impl IntoIterator<Item = &'c FilteredCandidate>,
	inputs: &ScoringInputs<'_>,
	pool_size: usize,
) -> (Vec<RankedEntry>, usize) {
	let mut ranked = candidates
		.into_iter()
		.map(|candidate| RankedEntry {
			entry: candidate.entry.clone(),
			tags: candidate.tags.clone(),
			score: score_candidate(candidate, inputs),
		})
		.collect::<Vec<_>>();

	ranked.sort_by(compare_ranked);

	let total = ranked.len();

	ranked.truncate(pool_size);

	(ranked, total)
}

/// Score descending, then newer first. Type and id settle exact ties so the order is total.
pub fn compare_ranked(a: &RankedEntry, b: &RankedEntry) -> Ordering {
	b.score
		.total_cmp(&a.score)
		.then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
		.then_with(|| a.entry.entry_type.cmp(&b.entry.entry_type))
		.then_with(|| a.entry.id.cmp(&b.entry.id))
}

/// In `0.0..=1.0`, decreasing with age.
pub fn recency(cfg: &ScoringRecency, age_days: f64) -> f64 {
	let age = age_days.max(0.0);

	match cfg.curve.as_str() {
		"linear" if cfg.window_days > 0.0 => (1.0 - age / cfg.window_days).max(0.0),
		"linear" => 0.0,
		_ => 0.5_f64.powf(age / cfg.half_life_days),
	}
}

/// In `0.0..=1.0`, 1.0 for the requested scope and decreasing outward.
pub fn proximity(cfg: &ScoringProximity, scope_index: usize, chain_len: usize) -> f64 {
	let index = scope_index as f64;

	match cfg.falloff.as_str() {
		"reciprocal" => 1.0 / (1.0 + index),
		"exponential" => cfg.base.powf(index),
		_ => {
			let breadth = chain_len.max(1) as f64;

			(1.0 - index / breadth).max(0.0)
		},
	}
}

fn age_days(now: OffsetDateTime, created_at: OffsetDateTime) -> f64 {
	(now - created_at).as_seconds_f64() / SECONDS_PER_DAY
}

fn feedback_adjustment(cfg: &Scoring, counts: &FeedbackCounts) -> f64 {
	let feedback = &cfg.feedback;
	let boost = (feedback.boost_per_positive * f64::from(counts.positive)).min(feedback.boost_max);
	let penalty =
		(feedback.penalty_per_negative * f64::from(counts.negative)).min(feedback.penalty_max);

	boost - penalty
}

fn smart_priority(cfg: &Scoring, signal: &AdaptiveSignal) -> f64 {
	let smart = &cfg.smart_priority;
	let composite = smart.adaptive_weight * signal.adaptive_weight.clamp(0.0, 1.0)
		+ smart.usefulness_weight * signal.usefulness.clamp(0.0, 1.0)
		+ smart.context_weight * signal.context_similarity.clamp(0.0, 1.0);

	smart.weight * composite
}
