use crate::{
	QueryDeps, Result,
	hierarchy::{HierarchicalRetriever, RetrieveOptions},
	pipeline::{
		IdSets, PipelineContext, SemanticScore, SemanticSource, Stage, mark_stage_completed,
		record_decision, validate_stage_prerequisites,
	},
	stages::{degradable, degraded_reason, merge_semantic_score},
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Hierarchical)?;

	let cfg = &deps.cfg.hierarchical;
	let collaborators = deps.collaborators;
	let (Some(summaries), Some(embeddings)) =
		(collaborators.summaries.as_ref(), collaborators.embeddings.as_ref())
	else {
		return Ok(mark_stage_completed(ctx, Stage::Hierarchical));
	};

	if !cfg.enabled || !ctx.strategy().uses_semantic() {
		return Ok(mark_stage_completed(ctx, Stage::Hierarchical));
	}

	let Some(text) = ctx.search_text().map(str::to_string) else {
		return Ok(mark_stage_completed(ctx, Stage::Hierarchical));
	};
	let embedding = match degradable(
		deps.deadline.call("query embedding", deps.collaborator_timeout(), embeddings.embed(&text)).await,
	)? {
		Ok(embedding) if !embedding.is_empty() => embedding,
		Ok(_) => return Ok(mark_stage_completed(ctx, Stage::Hierarchical)),
		Err(err) => {
			tracing::warn!(error = %err, "Query embedding failed; skipping hierarchical retrieval.");

			ctx = record_decision(ctx, "hierarchical", degraded_reason(&err));

			return Ok(mark_stage_completed(ctx, Stage::Hierarchical));
		},
	};
	let retriever = HierarchicalRetriever::new(summaries.clone(), Some(embeddings.clone()));
	let mut options = RetrieveOptions::from_config(cfg, deps.collaborator_timeout());

	options.entry_types = Some(ctx.params.types.clone());
	options.query_embedding = Some(embedding.clone());
	options.deadline = Some(deps.deadline.clone());

	let max_results = cfg.max_results as usize;
	let mut ids = IdSets::new();
	let mut scores = ctx.semantic_scores.take().unwrap_or_default();
	let mut found = 0;

	for level in &ctx.scope_chain {
		if found >= max_results {
			break;
		}

		options.max_results = max_results - found;

		let result = retriever
			.retrieve(&text, level.scope_type, level.scope_id.as_deref(), &options)
			.await?;

		for entry in result.entries {
			if !ids.entry(entry.entry_type).or_default().insert(entry.id) {
				continue;
			}

			found += 1;

			merge_semantic_score(
				&mut scores,
				entry.id,
				SemanticScore {
					entry_type: entry.entry_type,
					score: f64::from(entry.contribution_score.clamp(0.0, 1.0)),
					source: SemanticSource::Hierarchical,
				},
			);
		}
	}

	tracing::debug!(found, "Hierarchical retrieval finished.");

	ctx.query_embedding = Some(embedding);
	ctx.hierarchical_ids = Some(ids);
	ctx.semantic_scores = (!scores.is_empty()).then_some(scores);
	ctx = record_decision(ctx, "hierarchicalMatches", found);

	Ok(mark_stage_completed(ctx, Stage::Hierarchical))
}
