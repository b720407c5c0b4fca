use crate::{
	QueryDeps, Result,
	pipeline::{
		PipelineContext, SemanticScore, SemanticSource, Stage, mark_stage_completed,
		record_decision, validate_stage_prerequisites,
	},
	stages::{degradable, degraded_reason, merge_semantic_score},
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Semantic)?;

	if !ctx.strategy().uses_semantic() {
		return Ok(mark_stage_completed(ctx, Stage::Semantic));
	}

	let Some(text) = ctx.search_text().map(str::to_string) else {
		return Ok(mark_stage_completed(ctx, Stage::Semantic));
	};
	let Some(vectors) = deps.collaborators.vectors.as_ref() else {
		ctx = record_decision(ctx, "semantic", "no_vector_index");

		return Ok(mark_stage_completed(ctx, Stage::Semantic));
	};
	let embedding = match ctx.query_embedding.clone() {
		Some(embedding) => embedding,
		None => {
			let Some(embeddings) = deps.collaborators.embeddings.as_ref() else {
				ctx = record_decision(ctx, "semantic", "no_embedding_service");

				return Ok(mark_stage_completed(ctx, Stage::Semantic));
			};

			match degradable(
				deps.deadline
					.call("query embedding", deps.collaborator_timeout(), embeddings.embed(&text))
					.await,
			)? {
				Ok(embedding) => embedding,
				Err(err) => {
					tracing::warn!(error = %err, "Query embedding failed; semantic search skipped.");

					ctx = record_decision(ctx, "semantic", degraded_reason(&err));

					return Ok(mark_stage_completed(ctx, Stage::Semantic));
				},
			}
		},
	};
	let cfg = &deps.cfg.semantic;
	let hits = match degradable(
		deps.deadline
			.call(
				"vector search",
				deps.collaborator_timeout(),
				vectors.search_similar(&embedding, &ctx.params.types, cfg.candidate_k as usize),
			)
			.await,
	)? {
		Ok(hits) => hits,
		Err(err) => {
			tracing::warn!(error = %err, "Vector search failed; semantic search skipped.");

			ctx = record_decision(ctx, "semantic", degraded_reason(&err));

			return Ok(mark_stage_completed(ctx, Stage::Semantic));
		},
	};
	let mut scores = ctx.semantic_scores.take().unwrap_or_default();
	let mut kept = 0_usize;

	for hit in hits {
		if hit.score < cfg.min_score || !ctx.params.types.contains(&hit.entry_type) {
			continue;
		}

		kept += 1;

		merge_semantic_score(
			&mut scores,
			hit.id,
			SemanticScore {
				entry_type: hit.entry_type,
				score: f64::from(hit.score.clamp(0.0, 1.0)),
				source: SemanticSource::Vector,
			},
		);
	}

	ctx.query_embedding = Some(embedding);
	ctx.semantic_scores = Some(scores);
	ctx = record_decision(ctx, "semanticMatches", kept);

	Ok(mark_stage_completed(ctx, Stage::Semantic))
}
