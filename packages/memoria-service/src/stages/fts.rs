use std::collections::HashMap;

use crate::{
	QueryDeps, Result,
	pipeline::{
		IdSets, PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
	stages::{degradable, degraded_reason, fetch_limit},
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Fts)?;

	if !ctx.strategy().uses_lexical() {
		return Ok(mark_stage_completed(ctx, Stage::Fts));
	}

	let Some(text) = ctx.search_text().map(str::to_string) else {
		return Ok(mark_stage_completed(ctx, Stage::Fts));
	};
	let limit = fetch_limit(&ctx, deps);
	let hits = match degradable(
		deps.deadline
			.call(
				"lexical search",
				deps.collaborator_timeout(),
				deps.collaborators.lexical.execute_fts5_search(
					&text,
					&ctx.params.types,
					&ctx.scope_chain,
					limit,
				),
			)
			.await,
	)? {
		Ok(hits) => hits,
		Err(err) => {
			tracing::warn!(error = %err, "Lexical search failed; falling back to substring matching.");

			ctx = record_decision(ctx, "fts", degraded_reason(&err));

			return Ok(mark_stage_completed(ctx, Stage::Fts));
		},
	};
	let max_score = hits
		.iter()
		.filter_map(|hit| hit.score)
		.filter(|score| score.is_finite() && *score > 0.0)
		.fold(0.0_f32, f32::max);
	let mut ids = IdSets::new();
	let mut scores = HashMap::new();

	for hit in hits {
		if !ctx.params.types.contains(&hit.entry_type) {
			continue;
		}

		ids.entry(hit.entry_type).or_default().insert(hit.id);

		if let Some(score) = hit.score
			&& score.is_finite()
			&& max_score > 0.0
		{
			let normalized = f64::from((score / max_score).clamp(0.0, 1.0));

			scores
				.entry(hit.id)
				.and_modify(|existing: &mut f64| *existing = existing.max(normalized))
				.or_insert(normalized);
		}
	}

	let matches = ids.values().map(|set| set.len()).sum::<usize>();

	ctx.fts_match_ids = Some(ids);
	ctx.fts_scores = Some(scores);
	ctx = record_decision(ctx, "ftsMatches", matches);

	Ok(mark_stage_completed(ctx, Stage::Fts))
}
