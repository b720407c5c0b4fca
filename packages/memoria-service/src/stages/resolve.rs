use crate::{
	Error, QueryDeps, Result,
	pipeline::{
		PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
};

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Resolve)?;

	let chain = deps
		.deadline
		.call(
			"scope resolution",
			deps.collaborator_timeout(),
			deps.collaborators.entries.resolve_scope_chain(&ctx.params.scope),
		)
		.await?;

	if chain.is_empty() {
		return Err(Error::Validation {
			message: format!("Scope {} could not be resolved.", ctx.params.scope.scope_type),
		});
	}

	let depth = chain.len();

	ctx.scope_chain = chain;
	ctx = record_decision(ctx, "scopeChainLength", depth);

	Ok(mark_stage_completed(ctx, Stage::Resolve))
}
