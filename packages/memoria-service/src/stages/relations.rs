use crate::{
	QueryDeps, Result,
	graph::traverse_relation_graph,
	pipeline::{
		IdSets, PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
	stages::{degradable, degraded_reason},
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Relations)?;

	let Some(seed) = ctx.params.related_to.clone() else {
		return Ok(mark_stage_completed(ctx, Stage::Relations));
	};
	let traversal = traverse_relation_graph(
		deps.collaborators.relations.as_ref(),
		&[seed.key],
		seed.direction,
		seed.relation.as_deref(),
		seed.depth,
		&deps.deadline,
		deps.collaborator_timeout(),
	)
	.await;
	let related = match degradable(traversal)? {
		Ok(related) => related,
		Err(err) => {
			tracing::warn!(error = %err, "Relation traversal failed; no related entries.");

			ctx = record_decision(ctx, "relations", degraded_reason(&err));

			IdSets::new()
		},
	};
	let count = related.values().map(|ids| ids.len()).sum::<usize>();

	tracing::debug!(seed = %seed.key.id, depth = seed.depth, count, "Related entries resolved.");

	ctx.related_ids = Some(related);
	ctx = record_decision(ctx, "relatedCount", count);

	Ok(mark_stage_completed(ctx, Stage::Relations))
}
