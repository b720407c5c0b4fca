use memoria_domain::EntryKey;

use crate::{
	QueryDeps, Result,
	pipeline::{
		PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
	stages::{degradable, degraded_reason},
};

/// Loads feedback history and adaptive signals for the surviving candidates. Each lookup runs
/// only when its scoring term is enabled and a collaborator backs it.
pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Feedback)?;

	let keys = ctx
		.filtered
		.iter()
		.flat_map(|filtered| filtered.values().flatten())
		.map(|candidate| candidate.entry.key())
		.collect::<Vec<EntryKey>>();

	if keys.is_empty() {
		return Ok(mark_stage_completed(ctx, Stage::Feedback));
	}

	let scoring = &deps.cfg.scoring;

	if scoring.feedback.enabled
		&& let Some(feedback) = deps.collaborators.feedback.as_ref()
	{
		match degradable(
			deps.deadline
				.call("feedback lookup", deps.collaborator_timeout(), feedback.feedback_counts(&keys))
				.await,
		)? {
			Ok(counts) => ctx.feedback = Some(counts),
			Err(err) => {
				tracing::warn!(error = %err, "Feedback lookup failed; feedback term disabled.");

				ctx = record_decision(ctx, "feedback", degraded_reason(&err));
			},
		}
	}

	if scoring.smart_priority.enabled
		&& let Some(adaptive) = deps.collaborators.adaptive.as_ref()
	{
		let query = ctx.search_text().unwrap_or_default().to_string();

		match degradable(
			deps.deadline
				.call("adaptive weights", deps.collaborator_timeout(), adaptive.signals(&query, &keys))
				.await,
		)? {
			Ok(signals) => ctx.adaptive = Some(signals),
			Err(err) => {
				tracing::warn!(error = %err, "Adaptive weight lookup failed; smart priority disabled.");

				ctx = record_decision(ctx, "smartPriority", degraded_reason(&err));
			},
		}
	}

	Ok(mark_stage_completed(ctx, Stage::Feedback))
}
