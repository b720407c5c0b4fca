//! One module per pipeline stage. Every stage validates its prerequisites on entry and marks
//! itself complete on exit, including when its feature is disabled.

pub mod cross_encoder;
pub mod entity_filter;
pub mod feedback;
pub mod fetch;
pub mod filter;
pub mod fts;
pub mod hierarchical;
pub mod relations;
pub mod rerank;
pub mod resolve;
pub mod rewrite;
pub mod score;
pub mod semantic;
pub mod strategy;
pub mod tags;

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
	Error, QueryDeps, Result,
	pipeline::{PipelineContext, SemanticScore, Stage},
};

pub(crate) async fn run_stage(
	stage: Stage,
	ctx: PipelineContext,
	deps: &QueryDeps<'_>,
) -> Result<PipelineContext> {
	match stage {
		Stage::Resolve => resolve::run(ctx, deps).await,
		Stage::Strategy => strategy::run(ctx, deps).await,
		Stage::Rewrite => rewrite::run(ctx, deps).await,
		Stage::Hierarchical => hierarchical::run(ctx, deps).await,
		Stage::Semantic => semantic::run(ctx, deps).await,
		Stage::Fts => fts::run(ctx, deps).await,
		Stage::Relations => relations::run(ctx, deps).await,
		Stage::Fetch => fetch::run(ctx, deps).await,
		Stage::EntityFilter => entity_filter::run(ctx, deps).await,
		Stage::Tags => tags::run(ctx, deps).await,
		Stage::Filter => filter::run(ctx, deps).await,
		Stage::Feedback => feedback::run(ctx, deps).await,
		Stage::Score => score::run(ctx, deps).await,
		Stage::Rerank => rerank::run(ctx, deps).await,
		Stage::CrossEncoder => cross_encoder::run(ctx, deps).await,
	}
}

/// Separates errors a stage absorbs (`Ok(Err(_))`) from errors that end the request (`Err(_)`).
pub(crate) fn degradable<T>(result: Result<T>) -> Result<Result<T>> {
	match result {
		Ok(value) => Ok(Ok(value)),
		Err(err) if err.is_degradable() => Ok(Err(err)),
		Err(err) => Err(err),
	}
}

/// Size of the scored pool kept after SCORE: `ceil(limit * overscan_factor)`.
pub fn overscan_size(limit: usize, overscan_factor: f32) -> usize {
	((limit as f64) * f64::from(overscan_factor)).ceil() as usize
}

/// Upper bound for unconstrained candidate fetches.
pub(crate) fn fetch_limit(ctx: &PipelineContext, deps: &QueryDeps<'_>) -> usize {
	let pool = overscan_size(ctx.params.limit, deps.cfg.query.overscan_factor);

	pool.saturating_mul(deps.cfg.query.fetch_headroom as usize).max(1)
}

pub(crate) fn degraded_reason(err: &Error) -> &'static str {
	match err {
		Error::Timeout { .. } => "timeout",
		_ => "unavailable",
	}
}

/// Keeps the higher similarity when two semantic sources report the same entry.
pub(crate) fn merge_semantic_score(
	scores: &mut HashMap<Uuid, SemanticScore>,
	id: Uuid,
	score: SemanticScore,
) {
	scores
		.entry(id)
		.and_modify(|existing| {
			if score.score > existing.score {
				*existing = score;
			}
		})
		.or_insert(score);
}
