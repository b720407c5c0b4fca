use std::{sync::Arc, time::Duration};

use memoria_domain::{EntryType, SearchStrategy};
use memoria_service::{
	Collaborators, QueryRequest,
	pipeline::{PipelineContext, initialize_telemetry},
	stages::strategy::decide_strategy,
};

use super::{FakeVectors, MemoryStore, collaborators, context, deps, search_request, test_config};

fn with_vectors(vectors: Arc<FakeVectors>) -> Collaborators {
	collaborators(Arc::new(MemoryStore::new(Vec::new()))).with_vectors(vectors)
}

async fn decide(collaborators: &Collaborators, request: &QueryRequest) -> PipelineContext {
	let cfg = test_config();
	let deps = deps(&cfg, collaborators);
	let ctx = initialize_telemetry(context(&cfg, request));

	decide_strategy(ctx, &deps).await.expect("Strategy selection must not fail.")
}

#[tokio::test]
async fn decision_table_applies_in_order() {
	let collaborators = with_vectors(Arc::new(FakeVectors::with_coverage(10, 10)));
	let cases = [
		(QueryRequest { semantic_search: true, use_fts5: true, ..Default::default() }, SearchStrategy::Like),
		(
			QueryRequest { semantic_search: true, use_fts5: true, ..search_request("deploy") },
			SearchStrategy::Hybrid,
		),
		(QueryRequest { semantic_search: true, ..search_request("deploy") }, SearchStrategy::Semantic),
		(QueryRequest { use_fts5: true, ..search_request("deploy") }, SearchStrategy::Fts5),
	];

	for (request, expected) in cases {
		let ctx = decide(&collaborators, &request).await;

		assert_eq!(ctx.search_strategy, Some(expected), "request: {request:?}");
	}
}

#[tokio::test]
async fn coverage_equal_to_threshold_selects_hybrid() {
	let collaborators = with_vectors(Arc::new(FakeVectors::with_coverage(10, 8)));
	let ctx = decide(&collaborators, &search_request("deploy")).await;

	assert_eq!(ctx.search_strategy, Some(SearchStrategy::Hybrid));
}

#[tokio::test]
async fn coverage_below_threshold_selects_fts5() {
	let collaborators = with_vectors(Arc::new(FakeVectors::with_coverage(10, 7)));
	let ctx = decide(&collaborators, &search_request("deploy")).await;
	let telemetry = ctx.telemetry.as_ref().expect("Telemetry was initialized.");

	assert_eq!(ctx.search_strategy, Some(SearchStrategy::Fts5));
	assert_eq!(telemetry.decisions["strategyReason"], "coverage_below_threshold");
}

#[tokio::test]
async fn coverage_just_below_threshold_is_not_rounded_up() {
	let collaborators = with_vectors(Arc::new(FakeVectors::with_coverage(100_000_000, 79_999_999)));
	let ctx = decide(&collaborators, &search_request("deploy")).await;
	let telemetry = ctx.telemetry.as_ref().expect("Telemetry was initialized.");

	assert_eq!(ctx.search_strategy, Some(SearchStrategy::Fts5));
	assert_eq!(telemetry.decisions["strategyReason"], "coverage_below_threshold");
}

#[tokio::test]
async fn coverage_is_queried_with_singular_types() {
	let vectors = Arc::new(FakeVectors::with_coverage(4, 4));
	let collaborators = with_vectors(vectors.clone());
	let request = QueryRequest {
		types: Some(vec!["knowledge".to_string(), "guidelines".to_string(), "tools".to_string()]),
		..search_request("deploy")
	};

	decide(&collaborators, &request).await;

	assert_eq!(
		vectors.recorded_types(),
		vec![vec![EntryType::Knowledge, EntryType::Guideline, EntryType::Tool]]
	);
}

#[tokio::test]
async fn unavailable_coverage_falls_back_to_fts5() {
	let collaborators = with_vectors(Arc::new(FakeVectors::default()));
	let ctx = decide(&collaborators, &search_request("deploy")).await;
	let telemetry = ctx.telemetry.as_ref().expect("Telemetry was initialized.");

	assert_eq!(ctx.search_strategy, Some(SearchStrategy::Fts5));
	assert_eq!(telemetry.decisions["strategyReason"], "coverage_unavailable");
}

#[tokio::test]
async fn missing_vector_index_falls_back_to_fts5() {
	let collaborators = collaborators(Arc::new(MemoryStore::new(Vec::new())));
	let ctx = decide(&collaborators, &search_request("deploy")).await;

	assert_eq!(ctx.search_strategy, Some(SearchStrategy::Fts5));
}

#[tokio::test(start_paused = true)]
async fn slow_coverage_check_times_out_to_fts5() {
	let vectors = FakeVectors {
		coverage_delay: Some(Duration::from_secs(10)),
		..FakeVectors::with_coverage(10, 10)
	};
	let collaborators = with_vectors(Arc::new(vectors));
	let ctx = decide(&collaborators, &search_request("deploy")).await;
	let telemetry = ctx.telemetry.as_ref().expect("Telemetry was initialized.");

	assert_eq!(ctx.search_strategy, Some(SearchStrategy::Fts5));
	assert_eq!(telemetry.decisions["strategyReason"], "coverage_timeout");
}

#[tokio::test]
async fn decided_strategy_is_never_rederived() {
	let cfg = test_config();
	let collaborators = with_vectors(Arc::new(FakeVectors::with_coverage(10, 10)));
	let deps = deps(&cfg, &collaborators);
	let mut ctx = context(&cfg, &QueryRequest::default());

	ctx.search_strategy = Some(SearchStrategy::Semantic);

	let ctx = decide_strategy(ctx, &deps).await.expect("Strategy selection must not fail.");

	assert_eq!(ctx.search_strategy, Some(SearchStrategy::Semantic));
}
