use std::collections::HashMap;

use memoria_domain::{extract_entities, match_entities};

use crate::{
	QueryDeps, Result,
	pipeline::{
		PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
};

/// Tags candidates whose name or content mentions an entity named in the query. Matches become a
/// scoring boost; nothing is removed here.
pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::EntityFilter)?;

	if !deps.cfg.scoring.entity.enabled {
		return Ok(mark_stage_completed(ctx, Stage::EntityFilter));
	}

	let Some(search) = ctx.params.search.as_deref() else {
		return Ok(mark_stage_completed(ctx, Stage::EntityFilter));
	};
	let entities = extract_entities(search);
	let mut matches = HashMap::new();

	if !entities.is_empty()
		&& let Some(fetched) = &ctx.fetched_entries
	{
		for entry in fetched.values().flatten() {
			if let Some(found) = match_entities(&entities, entry) {
				matches.insert(entry.id, found);
			}
		}
	}

	tracing::debug!(entities = entities.len(), matched = matches.len(), "Entity matching finished.");

	ctx.entity_matches = Some(matches);
	ctx = record_decision(ctx, "entities", entities);

	Ok(mark_stage_completed(ctx, Stage::EntityFilter))
}
