use memoria_domain::rewrite_query;

use crate::{
	QueryDeps, Result,
	pipeline::{
		PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Rewrite)?;

	let cfg = &deps.cfg.rewrite;

	if cfg.enabled
		&& let Some(search) = ctx.params.search.as_deref()
	{
		let rewrite = rewrite_query(search, cfg.max_terms as usize, cfg.detect_intent);
		let intent = rewrite.intent.map(|intent| intent.as_str()).unwrap_or("none");

		tracing::debug!(intent, terms = rewrite.terms.len(), "Query rewritten.");

		ctx.rewrite = Some(rewrite);
		ctx = record_decision(ctx, "intent", intent);
	}

	Ok(mark_stage_completed(ctx, Stage::Rewrite))
}
