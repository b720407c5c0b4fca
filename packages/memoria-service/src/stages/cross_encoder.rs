use crate::{
	QueryDeps, Result,
	pipeline::{PipelineContext, Stage},
	stages::rerank::{ModelPass, apply_model_pass},
};

/// Same blending as RERANK, run with the LLM cross-encoder over a smaller head.
pub async fn run(ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	let cfg = &deps.cfg.cross_encoder;
	let pass = ModelPass {
		stage: Stage::CrossEncoder,
		decision_key: "crossEncoder",
		operation: "cross-encoder",
		enabled: cfg.enabled,
		top_n: cfg.top_n as usize,
		alpha: cfg.alpha,
		model: deps.collaborators.cross_encoder.as_ref(),
	};

	apply_model_pass(ctx, deps, pass).await
}
