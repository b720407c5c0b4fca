//! Request-scoped pipeline state and the executor that threads it through the stages.

pub mod context;
pub mod executor;
pub mod stage;
pub mod telemetry;

pub use context::{
	FilteredCandidate, IdSets, PipelineContext, RankedEntry, SemanticScore, SemanticSource,
	mark_stage_completed, validate_stage_prerequisites,
};
pub use executor::execute;
pub use stage::{Stage, StageSet};
pub use telemetry::{
	StageTelemetry, Telemetry, finalize_telemetry, initialize_telemetry, record_decision,
	record_stage_telemetry,
};
