use std::{collections::HashMap, sync::Arc};

use memoria_config::Config;
use memoria_domain::{EntityMatch, EntryType, QueryIntent};
use memoria_service::{
	AdaptiveSignal, QueryRequest, build_query_result,
	pipeline::{PipelineContext, Stage, execute},
	scoring::{ScoringInputs, rank_candidates, score_candidate},
};

use super::{
	MemoryStore, candidate, collaborators, context, deps, entry, now, project_chain,
	search_request, test_config,
};

fn inputs(cfg: &Config) -> ScoringInputs<'_> {
	ScoringInputs {
		cfg: &cfg.scoring,
		now: now(),
		chain_len: 1,
		semantic: None,
		fts: None,
		intent: None,
		feedback: None,
		entities: None,
		adaptive: None,
	}
}

async fn run_pipeline(cfg: &Config, store: MemoryStore, request: &QueryRequest) -> PipelineContext {
	let collaborators = collaborators(Arc::new(store));
	let deps = deps(cfg, &collaborators);

	execute(context(cfg, request), &Stage::ALL, &deps).await.expect("Pipeline must succeed.")
}

#[test]
fn higher_priority_guideline_scores_higher() {
	let cfg = test_config();
	let mut high = entry(EntryType::Guideline, "Review", "Review every migration.", 2);
	let mut low = high.clone();

	high.priority = Some(100);
	low.priority = Some(10);

	let inputs = inputs(&cfg);

	assert!(score_candidate(&candidate(high), &inputs) > score_candidate(&candidate(low), &inputs));
}

#[test]
fn explicit_relation_adds_exactly_its_weight() {
	let cfg = test_config();
	let tool = entry(EntryType::Tool, "psql", "Postgres shell.", 5);
	let mut related = candidate(tool.clone());
	let plain = candidate(tool);

	related.has_explicit_relation = true;

	let inputs = inputs(&cfg);
	let delta = score_candidate(&related, &inputs) - score_candidate(&plain, &inputs);

	assert!((delta - cfg.scoring.weights.explicit_relation).abs() < 1e-9, "delta = {delta}");
}

#[test]
fn intent_boosts_only_the_favored_type() {
	let cfg = test_config();
	let boost = cfg.scoring.weights.intent_boost;
	let cases = [
		(QueryIntent::Lookup, EntryType::Knowledge),
		(QueryIntent::HowTo, EntryType::Guideline),
		(QueryIntent::Debug, EntryType::Experience),
	];

	for (intent, favored) in cases {
		let with_intent = ScoringInputs { intent: Some(intent), ..inputs(&cfg) };

		for entry_type in EntryType::ALL {
			let scored = candidate(entry(entry_type, "item", "body", 3));
			let delta = score_candidate(&scored, &with_intent) - score_candidate(&scored, &inputs(&cfg));
			let expected = if entry_type == favored { boost } else { 0.0 };

			assert!((delta - expected).abs() < 1e-9, "{intent:?} on {entry_type:?}: delta = {delta}");
		}
	}
}

#[test]
fn entity_boost_distinguishes_exact_from_partial() {
	let mut cfg = test_config();
	let exact = candidate(entry(EntryType::Tool, "pgbouncer", "Connection pooler.", 3));
	let partial = candidate(entry(EntryType::Tool, "pooling", "Run pgbouncer per host.", 3));
	let entities = HashMap::from([
		(exact.entry.id, EntityMatch::Exact),
		(partial.entry.id, EntityMatch::Partial),
	]);

	cfg.scoring.entity.enabled = true;

	let matched = ScoringInputs { entities: Some(&entities), ..inputs(&cfg) };
	let exact_delta = score_candidate(&exact, &matched) - score_candidate(&exact, &inputs(&cfg));
	let partial_delta =
		score_candidate(&partial, &matched) - score_candidate(&partial, &inputs(&cfg));

	assert!((exact_delta - cfg.scoring.entity.exact_boost).abs() < 1e-9);
	assert!((partial_delta - cfg.scoring.entity.partial_boost).abs() < 1e-9);
	assert!(exact_delta > partial_delta);

	let mut disabled = test_config();

	disabled.scoring.entity.enabled = false;

	let ignored = ScoringInputs { entities: Some(&entities), ..inputs(&disabled) };

	assert_eq!(score_candidate(&exact, &ignored), score_candidate(&exact, &inputs(&disabled)));
}

#[test]
fn smart_priority_blends_adaptive_signals() {
	let mut cfg = test_config();
	let tool = candidate(entry(EntryType::Tool, "psql", "Postgres shell.", 5));
	let signals = HashMap::from([(
		tool.entry.id,
		AdaptiveSignal { adaptive_weight: 1.0, usefulness: 0.5, context_similarity: 2.0 },
	)]);

	cfg.scoring.smart_priority.enabled = true;

	let smart = &cfg.scoring.smart_priority;
	// Signals are clamped into 0..=1 before weighting.
	let expected = smart.weight
		* (smart.adaptive_weight + smart.usefulness_weight * 0.5 + smart.context_weight);
	let adaptive = ScoringInputs { adaptive: Some(&signals), ..inputs(&cfg) };
	let delta = score_candidate(&tool, &adaptive) - score_candidate(&tool, &inputs(&cfg));

	assert!((delta - expected).abs() < 1e-9, "delta = {delta}");
}

#[tokio::test]
async fn entity_filter_ranks_exact_name_above_mentions() {
	let mut cfg = test_config();

	cfg.scoring.entity.enabled = true;

	let exact = entry(EntryType::Tool, "PgBouncer", "Connection pooler.", 2);
	let partial = entry(EntryType::Tool, "Pooling", "Run PgBouncer in transaction mode.", 1);
	let store = MemoryStore::new(vec![partial.clone(), exact.clone()]);
	let ctx = run_pipeline(&cfg, store, &search_request("PgBouncer")).await;
	let matches = ctx.entity_matches.as_ref().expect("Entity matching ran.");

	assert_eq!(matches.get(&exact.id), Some(&EntityMatch::Exact));
	assert_eq!(matches.get(&partial.id), Some(&EntityMatch::Partial));
	assert_eq!(
		ctx.results.iter().map(|ranked| ranked.entry.id).collect::<Vec<_>>(),
		vec![exact.id, partial.id]
	);
}

#[test]
fn nearer_scope_scores_higher() {
	let cfg = test_config();
	let tool = entry(EntryType::Tool, "psql", "Postgres shell.", 5);
	let near = candidate(tool.clone());
	let mut far = candidate(tool);

	far.scope_index = 1;

	let inputs = ScoringInputs { chain_len: project_chain("p1").len(), ..inputs(&cfg) };

	assert!(score_candidate(&near, &inputs) > score_candidate(&far, &inputs));
}

#[test]
fn equal_scores_break_ties_by_newest_first() {
	let mut cfg = test_config();

	cfg.scoring.weights.recency_max = 0.0;

	let older = entry(EntryType::Tool, "a", "same", 10);
	let newer = entry(EntryType::Tool, "b", "same", 1);
	let candidates = [candidate(older.clone()), candidate(newer.clone())];
	let (ranked, total) = rank_candidates(candidates.iter(), &inputs(&cfg), 10);

	assert_eq!(total, 2);
	assert_eq!(ranked[0].score, ranked[1].score);
	assert_eq!(ranked[0].entry.id, newer.id);
	assert_eq!(ranked[1].entry.id, older.id);
}

#[tokio::test]
async fn score_keeps_overscan_pool_and_assembly_truncates() {
	let cfg = test_config();
	let created = entry(EntryType::Tool, "tool", "identical", 3);
	let entries = (0..20)
		.map(|_| {
			let mut tool = created.clone();

			tool.id = uuid::Uuid::new_v4();

			tool
		})
		.collect::<Vec<_>>();
	let request = QueryRequest {
		types: Some(vec!["tools".to_string()]),
		limit: Some(10),
		..Default::default()
	};
	let ctx = run_pipeline(&cfg, MemoryStore::new(entries), &request).await;

	assert_eq!(ctx.results.len(), 15);
	assert_eq!(ctx.total_candidates, Some(20));

	let response = build_query_result(&ctx);

	assert_eq!(response.results.len(), 10);
	assert_eq!(response.meta.returned_count, 10);
	assert_eq!(response.meta.total_count, 20);
	assert!(response.meta.truncated);
	assert!(response.meta.has_more);
	assert!(response.meta.next_cursor.is_some());
}

#[tokio::test]
async fn overscan_factor_is_configurable() {
	let mut cfg = test_config();

	cfg.query.overscan_factor = 2.0;

	let entries = (0..30).map(|i| entry(EntryType::Tool, "tool", "body", i)).collect::<Vec<_>>();
	let request = QueryRequest { limit: Some(10), ..Default::default() };
	let ctx = run_pipeline(&cfg, MemoryStore::new(entries), &request).await;

	assert_eq!(ctx.results.len(), 20);
}

#[tokio::test]
async fn results_form_a_strict_total_order() {
	let cfg = test_config();
	let mut entries = Vec::new();

	for (index, entry_type) in EntryType::ALL.iter().cycle().take(12).enumerate() {
		let mut item = entry(*entry_type, "item", "deploy notes", (index % 4) as i64);

		if *entry_type == EntryType::Guideline {
			item.priority = Some((index * 7 % 100) as i32);
		}

		entries.push(item);
	}

	let ctx = run_pipeline(&cfg, MemoryStore::new(entries), &QueryRequest::default()).await;

	assert_eq!(ctx.results.len(), 12);

	for pair in ctx.results.windows(2) {
		assert!(pair[0].score >= pair[1].score);

		if pair[0].score == pair[1].score {
			assert!(pair[0].entry.created_at >= pair[1].entry.created_at);
		}
	}
}
