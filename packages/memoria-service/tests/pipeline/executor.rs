use std::sync::Arc;

use memoria_domain::EntryType;
use memoria_service::{
	Error, QueryRequest,
	pipeline::{
		Stage, execute, finalize_telemetry, initialize_telemetry, mark_stage_completed,
		record_decision, record_stage_telemetry, validate_stage_prerequisites,
	},
};

use super::{MemoryStore, collaborators, context, deps, entry, search_request, test_config};

#[test]
fn mark_stage_completed_returns_new_set() {
	let cfg = test_config();
	let ctx = context(&cfg, &QueryRequest::default());
	let before = ctx.completed_stages;
	let next = mark_stage_completed(ctx.clone(), Stage::Resolve);

	assert!(!ctx.completed_stages.contains(Stage::Resolve));
	assert_eq!(ctx.completed_stages, before);
	assert!(next.completed_stages.contains(Stage::Resolve));
}

#[test]
fn missing_prerequisite_is_reported() {
	let cfg = test_config();
	let ctx = context(&cfg, &QueryRequest::default());

	assert!(validate_stage_prerequisites(&ctx, Stage::Resolve).is_ok());

	let err = validate_stage_prerequisites(&ctx, Stage::Filter).expect_err("FILTER needs FETCH.");

	assert!(matches!(err, Error::StageDependency { stage: Stage::Filter, missing: Stage::Fetch }));

	let fetched = mark_stage_completed(ctx, Stage::Fetch);
	let err = validate_stage_prerequisites(&fetched, Stage::Filter).expect_err("FILTER needs TAGS.");

	assert!(matches!(err, Error::StageDependency { missing: Stage::Tags, .. }));
}

#[test]
fn telemetry_helpers_are_identity_without_initialization() {
	let cfg = test_config();
	let ctx = context(&cfg, &QueryRequest::default());
	let completed = ctx.completed_stages;
	let ctx = record_decision(ctx, "strategy", "like");
	let ctx = record_stage_telemetry(ctx, Stage::Resolve, std::time::Instant::now(), Some(1), None);
	let ctx = finalize_telemetry(ctx);

	assert!(ctx.telemetry.is_none());
	assert_eq!(ctx.completed_stages, completed);
}

#[tokio::test]
async fn full_run_records_every_stage_in_order() {
	let cfg = test_config();
	let store = Arc::new(MemoryStore::new(vec![
		entry(EntryType::Tool, "pg_dump", "Dump a postgres database.", 1),
		entry(EntryType::Knowledge, "Backups", "Nightly postgres backups run at 02:00.", 3),
	]));
	let collaborators = collaborators(store);
	let deps = deps(&cfg, &collaborators);
	let ctx = initialize_telemetry(context(&cfg, &search_request("postgres")));
	let ctx = execute(ctx, &Stage::ALL, &deps).await.expect("Pipeline must succeed.");
	let telemetry = finalize_telemetry(ctx.clone()).telemetry.expect("Telemetry was initialized.");
	let names = telemetry.stages.iter().map(|stage| stage.name).collect::<Vec<_>>();

	assert_eq!(names, Stage::ALL.to_vec());
	assert_eq!(ctx.completed_stages.len(), Stage::ALL.len());
	assert!(telemetry.total_ms >= 0.0);
	assert!(telemetry.decisions.contains_key("strategy"));
	assert_eq!(ctx.results.len(), 2);
}

#[tokio::test]
async fn stage_errors_propagate_unchanged() {
	let cfg = test_config();
	let collaborators = collaborators(Arc::new(MemoryStore::new(Vec::new())));
	let deps = deps(&cfg, &collaborators);
	let ctx = context(&cfg, &QueryRequest::default());
	let err = execute(ctx, &[Stage::Score], &deps).await.expect_err("SCORE needs FILTER.");

	assert!(matches!(err, Error::StageDependency { stage: Stage::Score, missing: Stage::Filter }));
}

#[tokio::test]
async fn cancellation_stops_at_the_next_stage_boundary() {
	let cfg = test_config();
	let collaborators = collaborators(Arc::new(MemoryStore::new(Vec::new())));
	let deps = deps(&cfg, &collaborators);

	deps.deadline.cancel();

	let ctx = context(&cfg, &QueryRequest::default());
	let err = execute(ctx, &Stage::ALL, &deps).await.expect_err("Cancelled requests fail.");

	assert!(matches!(err, Error::Cancelled));
	assert!(!err.is_retryable());
}
