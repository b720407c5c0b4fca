use std::{
	collections::HashMap,
	sync::{Arc, atomic::Ordering},
	time::Duration,
};

use serde_json::json;

use memoria_domain::EntryType;
use memoria_service::{
	AdaptiveSignal, Collaborators, Deadline, Error, FeedbackCounts, InMemoryResultCache,
	MemoriaService, QueryRequest, SimilarHit, TagFilter, ValidDuring,
};

use super::{
	FakeAdaptive, FakeEmbedding, FakeFeedback, FakeModel, FakeVectors, MemoryStore, collaborators,
	days_ago, entry, search_request, test_config,
};

fn service(collaborators: Collaborators) -> MemoriaService {
	MemoriaService::new(test_config(), collaborators)
}

#[tokio::test]
async fn like_search_matches_substrings_across_types() {
	let tool = entry(EntryType::Tool, "pg_dump", "Dump a Postgres database.", 1);
	let knowledge = entry(EntryType::Knowledge, "Backups", "Nightly postgres backups.", 2);
	let store = Arc::new(MemoryStore::new(vec![
		tool.clone(),
		knowledge.clone(),
		entry(EntryType::Guideline, "Naming", "Use snake_case.", 1),
	]));
	let response = service(collaborators(store))
		.query(&search_request("postgres"))
		.await
		.expect("Query must succeed.");
	let ids = response.results.iter().map(|item| item.id).collect::<Vec<_>>();

	assert_eq!(ids, vec![tool.id, knowledge.id]);
	assert_eq!(response.meta.returned_count, 2);
	assert_eq!(response.meta.total_count, 2);
	assert!(!response.meta.truncated);
	assert!(response.telemetry.is_none());
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
	let store = Arc::new(MemoryStore::new(vec![entry(
		EntryType::Tool,
		"pg_dump",
		"Dump a postgres database.",
		1,
	)]));
	let service = service(collaborators(store.clone()))
		.with_cache(Some(Arc::new(InMemoryResultCache::new(Duration::from_secs(60), 8))));
	let request = QueryRequest { telemetry: true, ..search_request("postgres") };
	let first = service.query(&request).await.expect("First query must succeed.");
	let fetches = store.fetch_calls.load(Ordering::SeqCst);

	assert!(fetches > 0);

	let second = service.query(&request).await.expect("Cached query must succeed.");

	assert_eq!(store.fetch_calls.load(Ordering::SeqCst), fetches);
	assert_eq!(
		second.results.iter().map(|item| item.id).collect::<Vec<_>>(),
		first.results.iter().map(|item| item.id).collect::<Vec<_>>()
	);

	let telemetry = second.telemetry.expect("Telemetry was requested.");

	assert_eq!(telemetry.decisions.get("cacheHit"), Some(&json!(true)));
	assert!(telemetry.stages.is_empty());
}

#[tokio::test]
async fn tag_filters_require_and_exclude() {
	let kept = entry(EntryType::Tool, "deploy-a", "deploy service a", 1);
	let deprecated = entry(EntryType::Tool, "deploy-b", "deploy service b", 1);
	let untagged = entry(EntryType::Tool, "deploy-c", "deploy service c", 1);
	let store = Arc::new(
		MemoryStore::new(vec![kept.clone(), deprecated.clone(), untagged])
			.with_tags(kept.id, &["backup"])
			.with_tags(deprecated.id, &["backup", "deprecated"]),
	);
	let request = QueryRequest {
		tags: Some(TagFilter {
			include: Vec::new(),
			require: vec!["Backup".to_string()],
			exclude: vec!["deprecated".to_string()],
		}),
		..search_request("deploy")
	};
	let response = service(collaborators(store)).query(&request).await.expect("Query must succeed.");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].id, kept.id);
	assert_eq!(response.results[0].tags, vec!["backup".to_string()]);
}

#[tokio::test]
async fn semantic_hits_surface_entries_without_text_overlap() {
	let restore = entry(EntryType::Knowledge, "pg_restore", "Load a dump file.", 5);
	let vectors = FakeVectors {
		hits: vec![SimilarHit { entry_type: EntryType::Knowledge, id: restore.id, score: 0.9 }],
		..FakeVectors::with_coverage(1, 1)
	};
	let collaborators = collaborators(Arc::new(MemoryStore::new(vec![restore.clone()])))
		.with_vectors(Arc::new(vectors))
		.with_embeddings(Arc::new(FakeEmbedding::returning(vec![1.0, 0.0])));
	let request = QueryRequest { semantic_search: true, ..search_request("database recovery") };
	let response = service(collaborators).query(&request).await.expect("Query must succeed.");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].id, restore.id);
}

#[tokio::test]
async fn vector_outage_degrades_to_substring_matching() {
	let matching = entry(EntryType::Knowledge, "Restores", "database recovery runbook.", 5);
	let store =
		Arc::new(MemoryStore::new(vec![matching.clone(), entry(EntryType::Tool, "ls", "List.", 1)]));
	let vectors = FakeVectors { offline: true, ..FakeVectors::with_coverage(1, 1) };
	let collaborators = collaborators(store)
		.with_vectors(Arc::new(vectors))
		.with_embeddings(Arc::new(FakeEmbedding::returning(vec![1.0, 0.0])));
	let request = QueryRequest {
		semantic_search: true,
		telemetry: true,
		..search_request("database recovery")
	};
	let response = service(collaborators).query(&request).await.expect("Outages must degrade.");
	let telemetry = response.telemetry.expect("Telemetry was requested.");

	assert_eq!(response.results.len(), 1);
	assert_eq!(response.results[0].id, matching.id);
	assert_eq!(telemetry.decisions.get("semantic"), Some(&json!("unavailable")));
}

#[tokio::test]
async fn rerank_outage_keeps_pipeline_order() {
	let entries = vec![
		entry(EntryType::Knowledge, "one", "postgres one", 1),
		entry(EntryType::Knowledge, "two", "postgres two", 2),
		entry(EntryType::Knowledge, "three", "postgres three", 3),
	];
	let expected = entries.iter().map(|entry| entry.id).collect::<Vec<_>>();
	let mut cfg = test_config();

	cfg.rerank.enabled = true;

	let collaborators = collaborators(Arc::new(MemoryStore::new(entries)))
		.with_rerank(Arc::new(FakeModel::Offline));
	let request = QueryRequest { telemetry: true, ..search_request("postgres") };
	let response = MemoriaService::new(cfg, collaborators)
		.query(&request)
		.await
		.expect("Rerank failures must not fail the query.");
	let telemetry = response.telemetry.expect("Telemetry was requested.");

	assert_eq!(response.results.iter().map(|item| item.id).collect::<Vec<_>>(), expected);
	assert_eq!(telemetry.decisions.get("rerank"), Some(&json!("unavailable")));
}

#[tokio::test]
async fn rerank_reorders_the_head() {
	let entries = vec![
		entry(EntryType::Knowledge, "one", "postgres one", 1),
		entry(EntryType::Knowledge, "two", "postgres two", 2),
		entry(EntryType::Knowledge, "three", "postgres three", 3),
	];
	let reversed = entries.iter().rev().map(|entry| entry.id).collect::<Vec<_>>();
	let mut cfg = test_config();

	cfg.rerank.enabled = true;
	cfg.rerank.alpha = 1.0;

	let collaborators = collaborators(Arc::new(MemoryStore::new(entries)))
		.with_rerank(Arc::new(FakeModel::PrefersLast));
	let response = MemoriaService::new(cfg, collaborators)
		.query(&search_request("postgres"))
		.await
		.expect("Query must succeed.");

	assert_eq!(response.results.iter().map(|item| item.id).collect::<Vec<_>>(), reversed);
}

#[tokio::test]
async fn cross_encoder_reorders_the_head() {
	let entries = vec![
		entry(EntryType::Knowledge, "one", "postgres one", 1),
		entry(EntryType::Knowledge, "two", "postgres two", 2),
		entry(EntryType::Knowledge, "three", "postgres three", 3),
	];
	let reversed = entries.iter().rev().map(|entry| entry.id).collect::<Vec<_>>();
	let mut cfg = test_config();

	cfg.cross_encoder.enabled = true;
	cfg.cross_encoder.alpha = 1.0;

	let collaborators = collaborators(Arc::new(MemoryStore::new(entries)))
		.with_cross_encoder(Arc::new(FakeModel::PrefersLast));
	let request = QueryRequest { telemetry: true, ..search_request("postgres") };
	let response =
		MemoriaService::new(cfg, collaborators).query(&request).await.expect("Query must succeed.");
	let telemetry = response.telemetry.expect("Telemetry was requested.");

	assert_eq!(response.results.iter().map(|item| item.id).collect::<Vec<_>>(), reversed);
	assert_eq!(telemetry.decisions.get("crossEncoder"), Some(&json!("applied")));
}

#[tokio::test]
async fn cross_encoder_outage_keeps_pipeline_order() {
	let entries = vec![
		entry(EntryType::Knowledge, "one", "postgres one", 1),
		entry(EntryType::Knowledge, "two", "postgres two", 2),
		entry(EntryType::Knowledge, "three", "postgres three", 3),
	];
	let expected = entries.iter().map(|entry| entry.id).collect::<Vec<_>>();
	let mut cfg = test_config();

	cfg.cross_encoder.enabled = true;

	let collaborators = collaborators(Arc::new(MemoryStore::new(entries)))
		.with_cross_encoder(Arc::new(FakeModel::Offline));
	let request = QueryRequest { telemetry: true, ..search_request("postgres") };
	let response = MemoriaService::new(cfg, collaborators)
		.query(&request)
		.await
		.expect("Cross-encoder failures must not fail the query.");
	let telemetry = response.telemetry.expect("Telemetry was requested.");

	assert_eq!(response.results.iter().map(|item| item.id).collect::<Vec<_>>(), expected);
	assert_eq!(telemetry.decisions.get("crossEncoder"), Some(&json!("unavailable")));
}

#[tokio::test]
async fn negative_feedback_demotes_an_entry() {
	let newer = entry(EntryType::Knowledge, "newer", "postgres newer", 1);
	let older = entry(EntryType::Knowledge, "older", "postgres older", 2);
	let store = Arc::new(MemoryStore::new(vec![newer.clone(), older.clone()]));
	let baseline = service(collaborators(store.clone()))
		.query(&search_request("postgres"))
		.await
		.expect("Query must succeed.");

	assert_eq!(baseline.results[0].id, newer.id);

	let mut cfg = test_config();

	cfg.scoring.feedback.enabled = true;

	let feedback = FakeFeedback(Some(HashMap::from([(
		newer.id,
		FeedbackCounts { positive: 0, negative: 4 },
	)])));
	let response = MemoriaService::new(cfg, collaborators(store).with_feedback(Arc::new(feedback)))
		.query(&search_request("postgres"))
		.await
		.expect("Query must succeed.");

	assert_eq!(
		response.results.iter().map(|item| item.id).collect::<Vec<_>>(),
		vec![older.id, newer.id]
	);
}

#[tokio::test]
async fn feedback_outage_is_recorded_and_ignored() {
	let newer = entry(EntryType::Knowledge, "newer", "postgres newer", 1);
	let older = entry(EntryType::Knowledge, "older", "postgres older", 2);
	let mut cfg = test_config();

	cfg.scoring.feedback.enabled = true;

	let collaborators = collaborators(Arc::new(MemoryStore::new(vec![newer.clone(), older])))
		.with_feedback(Arc::new(FakeFeedback(None)));
	let request = QueryRequest { telemetry: true, ..search_request("postgres") };
	let response = MemoriaService::new(cfg, collaborators)
		.query(&request)
		.await
		.expect("Feedback outages must not fail the query.");
	let telemetry = response.telemetry.expect("Telemetry was requested.");

	assert_eq!(response.results[0].id, newer.id);
	assert_eq!(telemetry.decisions.get("feedback"), Some(&json!("unavailable")));
}

#[tokio::test]
async fn smart_priority_promotes_useful_entries() {
	let newer = entry(EntryType::Knowledge, "newer", "postgres newer", 1);
	let older = entry(EntryType::Knowledge, "older", "postgres older", 2);
	let mut cfg = test_config();

	cfg.scoring.smart_priority.enabled = true;

	let adaptive = FakeAdaptive(HashMap::from([(
		older.id,
		AdaptiveSignal { adaptive_weight: 1.0, usefulness: 1.0, context_similarity: 1.0 },
	)]));
	let collaborators = collaborators(Arc::new(MemoryStore::new(vec![newer.clone(), older.clone()])))
		.with_adaptive(Arc::new(adaptive));
	let response = MemoriaService::new(cfg, collaborators)
		.query(&search_request("postgres"))
		.await
		.expect("Query must succeed.");

	assert_eq!(
		response.results.iter().map(|item| item.id).collect::<Vec<_>>(),
		vec![older.id, newer.id]
	);
}

#[tokio::test]
async fn at_time_keeps_entries_valid_at_that_instant() {
	let mut expired = entry(EntryType::Knowledge, "expired", "release notes", 30);
	let mut not_yet = entry(EntryType::Knowledge, "not yet", "release notes", 30);
	let created_later = entry(EntryType::Knowledge, "later", "release notes", 3);
	let current = entry(EntryType::Knowledge, "current", "release notes", 20);

	expired.valid_until = Some(days_ago(10));
	not_yet.valid_from = Some(days_ago(5));

	let store = Arc::new(MemoryStore::new(vec![expired, not_yet, created_later, current.clone()]));
	let request = QueryRequest { at_time: Some(days_ago(7)), ..Default::default() };
	let response = service(collaborators(store)).query(&request).await.expect("Query must succeed.");

	assert_eq!(response.results.iter().map(|item| item.id).collect::<Vec<_>>(), vec![current.id]);
}

#[tokio::test]
async fn valid_during_keeps_overlapping_entries() {
	let mut ended_before = entry(EntryType::Knowledge, "ended", "on-call rota", 30);
	let mut overlapping = entry(EntryType::Knowledge, "overlapping", "on-call rota", 30);
	let started_after = entry(EntryType::Knowledge, "started", "on-call rota", 10);
	let open_ended = entry(EntryType::Knowledge, "open", "on-call rota", 40);

	ended_before.valid_until = Some(days_ago(25));
	overlapping.valid_until = Some(days_ago(18));

	let store = Arc::new(MemoryStore::new(vec![
		ended_before,
		overlapping.clone(),
		started_after,
		open_ended.clone(),
	]));
	let request = QueryRequest {
		valid_during: Some(ValidDuring { start: days_ago(20), end: days_ago(15) }),
		..Default::default()
	};
	let response = service(collaborators(store)).query(&request).await.expect("Query must succeed.");
	let mut ids = response.results.iter().map(|item| item.id).collect::<Vec<_>>();
	let mut expected = vec![overlapping.id, open_ended.id];

	ids.sort();
	expected.sort();

	assert_eq!(ids, expected);
}

#[tokio::test]
async fn unknown_type_is_rejected() {
	let request =
		QueryRequest { types: Some(vec!["widgets".to_string()]), ..search_request("postgres") };
	let err = service(collaborators(Arc::new(MemoryStore::default())))
		.query(&request)
		.await
		.expect_err("Unknown types must be rejected.");

	assert!(matches!(err, Error::Validation { .. }));
}

#[tokio::test]
async fn spent_deadline_fails_the_query() {
	let store = Arc::new(MemoryStore::new(Vec::new()));
	let err = service(collaborators(store.clone()))
		.query_with_deadline(&search_request("postgres"), Deadline::after(Duration::ZERO))
		.await
		.expect_err("A spent budget must fail.");

	assert!(matches!(err, Error::DeadlineExceeded));
	assert_eq!(store.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn drill_down_requires_a_summary_store() {
	let err = service(collaborators(Arc::new(MemoryStore::default())))
		.drill_down("missing-id")
		.await
		.expect_err("No summary store is configured.");

	assert!(matches!(err, Error::CollaboratorUnavailable { .. }));
}
