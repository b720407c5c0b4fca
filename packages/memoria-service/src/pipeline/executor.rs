use std::time::Instant;

use tracing::Instrument;

use crate::{
	QueryDeps, Result,
	pipeline::{PipelineContext, Stage, telemetry},
	stages,
};

/// Runs `stages` in order, one at a time. Stage errors propagate unchanged; the deadline is
/// checked before each stage starts.
pub async fn execute(
	mut ctx: PipelineContext,
	stages: &[Stage],
	deps: &QueryDeps<'_>,
) -> Result<PipelineContext> {
	for &stage in stages {
		deps.deadline.check()?;

		let started = Instant::now();
		let input_count = ctx.working_set_size();
		let span = tracing::debug_span!("pipeline_stage", stage = stage.as_str());

		ctx = stages::run_stage(stage, ctx, deps).instrument(span).await?;

		let output_count = ctx.working_set_size();

		tracing::debug!(
			stage = stage.as_str(),
			input_count = ?input_count,
			output_count = ?output_count,
			elapsed_ms = started.elapsed().as_millis() as u64,
			"Pipeline stage completed."
		);

		ctx = telemetry::record_stage_telemetry(ctx, stage, started, input_count, output_count);
	}

	Ok(ctx)
}
