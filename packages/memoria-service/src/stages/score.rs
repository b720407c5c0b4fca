use crate::{
	QueryDeps, Result,
	pipeline::{
		PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
	scoring::{ScoringInputs, rank_candidates},
	stages::overscan_size,
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Score)?;

	if ctx.filtered.is_none() {
		ctx.results = Vec::new();

		return Ok(mark_stage_completed(ctx, Stage::Score));
	}

	let pool_size = overscan_size(ctx.params.limit, deps.cfg.query.overscan_factor);
	let (results, total) = {
		let inputs = ScoringInputs::from_context(&ctx, &deps.cfg.scoring);
		let candidates = ctx.filtered.iter().flat_map(|filtered| filtered.values().flatten());

		rank_candidates(candidates, &inputs, pool_size)
	};

	tracing::debug!(total, kept = results.len(), pool_size, "Candidates scored.");

	ctx.results = results;
	ctx.total_candidates = Some(total);
	ctx = record_decision(ctx, "scoredCount", total);

	Ok(mark_stage_completed(ctx, Stage::Score))
}
