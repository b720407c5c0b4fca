use std::time::Duration;

use memoria_domain::SearchStrategy;

use crate::{
	Error, QueryDeps, Result,
	pipeline::{
		PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
	stages::degradable,
};

pub async fn run(ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Strategy)?;

	let ctx = decide_strategy(ctx, deps).await?;

	Ok(mark_stage_completed(ctx, Stage::Strategy))
}

/// Picks the retrieval mode once per request. First matching rule wins:
/// no search text, explicit flags, then embedding coverage in auto mode.
pub async fn decide_strategy(
	mut ctx: PipelineContext,
	deps: &QueryDeps<'_>,
) -> Result<PipelineContext> {
	if let Some(strategy) = ctx.search_strategy {
		tracing::debug!(strategy = strategy.as_str(), "Search strategy already decided.");

		return Ok(ctx);
	}

	let params = &ctx.params;
	let (strategy, reason) = if params.search.is_none() {
		(SearchStrategy::Like, "no_search_text")
	} else if params.semantic_search && params.use_fts5 {
		(SearchStrategy::Hybrid, "explicit")
	} else if params.semantic_search {
		(SearchStrategy::Semantic, "explicit")
	} else if params.use_fts5 {
		(SearchStrategy::Fts5, "explicit")
	} else {
		let (strategy, reason, ratio) = decide_by_coverage(&ctx, deps).await?;

		if let Some(ratio) = ratio {
			ctx = record_decision(ctx, "embeddingCoverage", ratio);
		}

		(strategy, reason)
	};

	tracing::debug!(strategy = strategy.as_str(), reason, "Search strategy decided.");

	ctx.search_strategy = Some(strategy);
	ctx = record_decision(ctx, "strategy", strategy.as_str());
	ctx = record_decision(ctx, "strategyReason", reason);

	Ok(ctx)
}

async fn decide_by_coverage(
	ctx: &PipelineContext,
	deps: &QueryDeps<'_>,
) -> Result<(SearchStrategy, &'static str, Option<f64>)> {
	let Some(vectors) = deps.collaborators.vectors.as_ref() else {
		return Ok((SearchStrategy::Fts5, "no_vector_index", None));
	};
	let timeout = Duration::from_millis(deps.cfg.strategy.coverage_timeout_ms);
	let result = deps
		.deadline
		.call(
			"embedding coverage",
			timeout,
			vectors.embedding_coverage(&ctx.scope_chain, &ctx.params.types),
		)
		.await;

	match degradable(result)? {
		Ok(coverage) => {
			let ratio = coverage.ratio();

			if ratio >= deps.cfg.strategy.coverage_threshold {
				Ok((SearchStrategy::Hybrid, "coverage_met", Some(ratio)))
			} else {
				Ok((SearchStrategy::Fts5, "coverage_below_threshold", Some(ratio)))
			}
		},
		Err(err) => {
			tracing::warn!(error = %err, "Embedding coverage check failed; using lexical search.");

			let reason = if matches!(err, Error::Timeout { .. }) {
				"coverage_timeout"
			} else {
				"coverage_unavailable"
			};

			Ok((SearchStrategy::Fts5, reason, None))
		},
	}
}
