use std::{collections::BTreeMap, time::Instant};

use serde::Serialize;
use serde_json::Value;

use crate::pipeline::{PipelineContext, Stage};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTelemetry {
	pub name: Stage,
	pub start_ms: f64,
	pub duration_ms: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub input_count: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub output_count: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
	#[serde(skip)]
	started: Instant,
	pub total_ms: f64,
	pub stages: Vec<StageTelemetry>,
	pub decisions: BTreeMap<String, Value>,
}
impl Telemetry {
	fn new() -> Self {
		Self { started: Instant::now(), total_ms: 0.0, stages: Vec::new(), decisions: BTreeMap::new() }
	}
}

pub fn initialize_telemetry(mut ctx: PipelineContext) -> PipelineContext {
	if ctx.telemetry.is_none() {
		ctx.telemetry = Some(Telemetry::new());
	}

	ctx
}

pub fn record_stage_telemetry(
	mut ctx: PipelineContext,
	stage: Stage,
	started: Instant,
	input_count: Option<usize>,
	output_count: Option<usize>,
) -> PipelineContext {
	if let Some(telemetry) = ctx.telemetry.as_mut() {
		let start_ms = millis(started.saturating_duration_since(telemetry.started));
		let duration_ms = millis(started.elapsed());

		telemetry.stages.push(StageTelemetry {
			name: stage,
			start_ms,
			duration_ms,
			input_count,
			output_count,
		});
	}

	ctx
}

pub fn record_decision(
	mut ctx: PipelineContext,
	key: &str,
	value: impl Into<Value>,
) -> PipelineContext {
	if let Some(telemetry) = ctx.telemetry.as_mut() {
		telemetry.decisions.insert(key.to_string(), value.into());
	}

	ctx
}

pub fn finalize_telemetry(mut ctx: PipelineContext) -> PipelineContext {
	if let Some(telemetry) = ctx.telemetry.as_mut() {
		telemetry.total_ms = millis(telemetry.started.elapsed());
	}

	ctx
}

fn millis(duration: std::time::Duration) -> f64 {
	duration.as_secs_f64() * 1_000.0
}
