use std::sync::Arc;

use crate::{
	QueryDeps, Result,
	collaborators::RelevanceModel,
	pipeline::{
		PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
	scoring::compare_ranked,
	stages::{degradable, degraded_reason},
};

/// Settings for one model pass over the head of the ranked pool.
pub(crate) struct ModelPass<'a> {
	pub stage: Stage,
	pub decision_key: &'static str,
	pub operation: &'static str,
	pub enabled: bool,
	pub top_n: usize,
	pub alpha: f64,
	pub model: Option<&'a Arc<dyn RelevanceModel>>,
}

pub async fn run(ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	let cfg = &deps.cfg.rerank;
	let pass = ModelPass {
		stage: Stage::Rerank,
		decision_key: "rerank",
		operation: "rerank",
		enabled: cfg.enabled,
		top_n: cfg.top_n as usize,
		alpha: cfg.alpha,
		model: deps.collaborators.rerank.as_ref(),
	};

	apply_model_pass(ctx, deps, pass).await
}

/// Blends model relevance into the pipeline score for the first `top_n` results, then re-sorts.
///
/// Blended values are mapped back into the head's original score range, so reordering stays
/// inside the head and entries below it keep their positions relative to it. Any model failure
/// leaves the order untouched.
pub(crate) async fn apply_model_pass(
	mut ctx: PipelineContext,
	deps: &QueryDeps<'_>,
	pass: ModelPass<'_>,
) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, pass.stage)?;

	let Some(model) = pass.model.filter(|_| pass.enabled) else {
		return Ok(mark_stage_completed(ctx, pass.stage));
	};
	let Some(query) = ctx.search_text().map(str::to_string) else {
		return Ok(mark_stage_completed(ctx, pass.stage));
	};
	let head = pass.top_n.min(ctx.results.len());

	if head < 2 {
		return Ok(mark_stage_completed(ctx, pass.stage));
	}

	let docs = ctx.results[..head]
		.iter()
		.map(|ranked| format!("{}\n{}", ranked.entry.name, ranked.entry.content))
		.collect::<Vec<_>>();
	let scores = match degradable(
		deps.deadline.call(pass.operation, deps.collaborator_timeout(), model.score(&query, &docs)).await,
	)? {
		Ok(scores) if scores.len() == head && scores.iter().all(|score| score.is_finite()) => scores,
		Ok(scores) => {
			tracing::warn!(
				stage = pass.stage.as_str(),
				expected = head,
				received = scores.len(),
				"Model returned unusable scores; keeping pipeline order."
			);

			ctx = record_decision(ctx, pass.decision_key, "invalid_scores");

			return Ok(mark_stage_completed(ctx, pass.stage));
		},
		Err(err) => {
			tracing::warn!(stage = pass.stage.as_str(), error = %err, "Model pass failed; keeping pipeline order.");

			ctx = record_decision(ctx, pass.decision_key, degraded_reason(&err));

			return Ok(mark_stage_completed(ctx, pass.stage));
		},
	};
	let pipeline = ctx.results[..head].iter().map(|ranked| ranked.score).collect::<Vec<_>>();
	let (low, high) = bounds(&pipeline);

	if high > low {
		let model_scores = scores.iter().map(|score| f64::from(*score)).collect::<Vec<_>>();
		let (model_low, model_high) = bounds(&model_scores);
		let alpha = pass.alpha.clamp(0.0, 1.0);

		for (ranked, model_score) in ctx.results[..head].iter_mut().zip(&model_scores) {
			let base = (ranked.score - low) / (high - low);
			let relevance = if model_high > model_low {
				(model_score - model_low) / (model_high - model_low)
			} else {
				base
			};
			let blended = (1.0 - alpha) * base + alpha * relevance;

			ranked.score = low + blended * (high - low);
		}

		ctx.results.sort_by(compare_ranked);
		ctx = record_decision(ctx, pass.decision_key, "applied");
	} else {
		ctx = record_decision(ctx, pass.decision_key, "flat_scores");
	}

	Ok(mark_stage_completed(ctx, pass.stage))
}

fn bounds(values: &[f64]) -> (f64, f64) {
	values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
		(low.min(*value), high.max(*value))
	})
}
