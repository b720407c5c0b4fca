use std::collections::{BTreeMap, HashSet};

use memoria_domain::{EntrySnapshot, EntryType};

use crate::{
	QueryDeps, Result,
	pipeline::{
		FilteredCandidate, PipelineContext, Stage, context::id_sets_contains,
		mark_stage_completed, record_decision, validate_stage_prerequisites,
	},
};

/// Applies the hard filters (scope, time, required and excluded tags, text relevance) and wraps
/// each survivor with the signals the scorer reads.
pub async fn run(mut ctx: PipelineContext, _deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Filter)?;

	let filtered = filter_candidates(&ctx);
	let kept = filtered.values().map(Vec::len).sum::<usize>();

	ctx.filtered = Some(filtered);
	ctx = record_decision(ctx, "filteredCount", kept);

	Ok(mark_stage_completed(ctx, Stage::Filter))
}

pub fn filter_candidates(ctx: &PipelineContext) -> BTreeMap<EntryType, Vec<FilteredCandidate>> {
	let search = ctx.params.search_lowercase();
	let terms = ctx.rewrite.as_ref().map(|rewrite| rewrite.terms.as_slice()).unwrap_or_default();
	let tag_filter = &ctx.params.tags;
	let mut out = BTreeMap::new();

	let Some(fetched) = &ctx.fetched_entries else {
		return out;
	};

	for (entry_type, entries) in fetched {
		let mut seen = HashSet::new();
		let mut candidates = Vec::new();

		for entry in entries {
			if entry.entry_type != *entry_type || !seen.insert(entry.id) {
				continue;
			}

			let Some(scope_index) = ctx.scope_index_of(entry) else {
				continue;
			};

			if !passes_temporal(ctx, entry) {
				continue;
			}

			let tags = ctx
				.tags
				.as_ref()
				.and_then(|tags| tags.get(&entry.id))
				.cloned()
				.unwrap_or_default();
			let lowered = tags.iter().map(|tag| tag.to_lowercase()).collect::<HashSet<_>>();

			if !tag_filter.require.iter().all(|tag| lowered.contains(tag))
				|| tag_filter.exclude.iter().any(|tag| lowered.contains(tag))
			{
				continue;
			}

			let text_matched = match &ctx.fts_match_ids {
				Some(ids) => id_sets_contains(ids, entry.entry_type, entry.id),
				None => search
					.as_deref()
					.map(|search| matches_text(entry, search, terms))
					.unwrap_or(false),
			};
			let has_explicit_relation = ctx
				.related_ids
				.as_ref()
				.map(|ids| id_sets_contains(ids, entry.entry_type, entry.id))
				.unwrap_or(false);
			let has_semantic = ctx
				.semantic_scores
				.as_ref()
				.map(|scores| scores.contains_key(&entry.id))
				.unwrap_or(false);

			if search.is_some() && !(text_matched || has_semantic || has_explicit_relation) {
				continue;
			}

			let matching_tag_count =
				tag_filter.include.iter().filter(|tag| lowered.contains(*tag)).count();

			candidates.push(FilteredCandidate {
				entry: entry.clone(),
				scope_index,
				tags,
				text_matched,
				matching_tag_count,
				has_explicit_relation,
			});
		}

		out.insert(*entry_type, candidates);
	}

	out
}

fn passes_temporal(ctx: &PipelineContext, entry: &EntrySnapshot) -> bool {
	if let Some(at) = ctx.params.at_time
		&& !entry.valid_at(at)
	{
		return false;
	}
	if let Some(window) = ctx.params.valid_during
		&& !entry.overlaps(window.start, window.end)
	{
		return false;
	}

	true
}

/// Substring match on the whole search text, or on every rewritten term when there are any.
fn matches_text(entry: &EntrySnapshot, search: &str, terms: &[String]) -> bool {
	if entry.contains_text(search) {
		return true;
	}

	!terms.is_empty() && terms.iter().all(|term| entry.contains_text(term))
}
