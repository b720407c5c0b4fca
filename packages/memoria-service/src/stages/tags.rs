use std::collections::HashMap;

use crate::{
	QueryDeps, Result,
	pipeline::{PipelineContext, Stage, mark_stage_completed, validate_stage_prerequisites},
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Tags)?;

	let ids = ctx
		.fetched_entries
		.iter()
		.flat_map(|fetched| fetched.values().flatten())
		.map(|entry| entry.id)
		.collect::<Vec<_>>();
	let tags = if ids.is_empty() {
		HashMap::new()
	} else {
		deps.deadline
			.call(
				"tag lookup",
				deps.collaborator_timeout(),
				deps.collaborators.entries.tags_for_entries(&ids),
			)
			.await?
	};

	ctx.tags = Some(tags);

	Ok(mark_stage_completed(ctx, Stage::Tags))
}
