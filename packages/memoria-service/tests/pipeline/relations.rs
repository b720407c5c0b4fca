use std::{
	collections::HashSet,
	sync::{Arc, atomic::Ordering},
	time::Duration,
};

use memoria_domain::{EntryKey, EntryType, RelationDirection};
use memoria_service::{
	Deadline, RelatedTo, graph::traverse_relation_graph,
	pipeline::{Stage, execute, initialize_telemetry},
};

use super::{MemoryStore, collaborators, context, deps, entry, search_request, test_config};

fn key(entry_type: EntryType) -> EntryKey {
	EntryKey::new(entry_type, uuid::Uuid::new_v4())
}

async fn traverse(
	store: &MemoryStore,
	seed: EntryKey,
	direction: RelationDirection,
	depth: u32,
) -> HashSet<EntryKey> {
	let related = traverse_relation_graph(
		store,
		&[seed],
		direction,
		None,
		depth,
		&Deadline::after(Duration::from_secs(5)),
		Duration::from_secs(1),
	)
	.await
	.expect("Traversal must succeed.");

	related
		.into_iter()
		.flat_map(|(entry_type, ids)| ids.into_iter().map(move |id| EntryKey::new(entry_type, id)))
		.collect()
}

#[tokio::test]
async fn cycles_terminate_and_exclude_the_seed() {
	let (a, b, c) = (key(EntryType::Tool), key(EntryType::Knowledge), key(EntryType::Experience));
	let store = MemoryStore::new(Vec::new())
		.with_edge(a, b, "uses")
		.with_edge(b, c, "uses")
		.with_edge(c, a, "uses");
	let related = traverse(&store, a, RelationDirection::Forward, 10).await;

	assert_eq!(related, HashSet::from([b, c]));
	assert_eq!(store.neighbor_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn depth_bounds_the_expansion() {
	let (a, b, c) = (key(EntryType::Tool), key(EntryType::Tool), key(EntryType::Tool));
	let store = MemoryStore::new(Vec::new()).with_edge(a, b, "next").with_edge(b, c, "next");

	assert_eq!(traverse(&store, a, RelationDirection::Forward, 1).await, HashSet::from([b]));
	assert_eq!(traverse(&store, a, RelationDirection::Forward, 2).await, HashSet::from([b, c]));
}

#[tokio::test]
async fn direction_selects_edge_orientation() {
	let (a, b, c) = (key(EntryType::Tool), key(EntryType::Guideline), key(EntryType::Experience));
	let store = MemoryStore::new(Vec::new()).with_edge(a, b, "follows").with_edge(c, a, "follows");

	assert_eq!(traverse(&store, a, RelationDirection::Forward, 1).await, HashSet::from([b]));
	assert_eq!(traverse(&store, a, RelationDirection::Backward, 1).await, HashSet::from([c]));
	assert_eq!(traverse(&store, a, RelationDirection::Both, 1).await, HashSet::from([b, c]));
}

#[tokio::test]
async fn related_entries_are_boosted_over_newer_matches() {
	let cfg = test_config();
	let seed = entry(EntryType::Tool, "restic", "Snapshot tool.", 30);
	let related = entry(EntryType::Knowledge, "Rotation", "backup rotation keeps 7 dailies.", 10);
	let newer = entry(EntryType::Knowledge, "Restore", "backup restore drill.", 1);
	let store = Arc::new(
		MemoryStore::new(vec![seed.clone(), related.clone(), newer.clone()]).with_edge(
			seed.key(),
			related.key(),
			"documents",
		),
	);
	let collaborators = collaborators(store);
	let deps = deps(&cfg, &collaborators);
	let mut request = search_request("backup");

	request.related_to = Some(RelatedTo {
		entry_type: "tool".to_string(),
		id: seed.id,
		relation: None,
		direction: None,
		depth: None,
	});

	let ctx = initialize_telemetry(context(&cfg, &request));
	let ctx = execute(ctx, &Stage::ALL, &deps).await.expect("Pipeline must succeed.");
	let ids = ctx.results.iter().map(|ranked| ranked.entry.id).collect::<Vec<_>>();

	assert_eq!(ids, vec![related.id, newer.id]);
	assert_eq!(
		ctx.telemetry.and_then(|telemetry| telemetry.decisions.get("relatedCount").cloned()),
		Some(serde_json::json!(1))
	);
}

#[tokio::test]
async fn related_to_without_search_returns_only_related_entries() {
	let cfg = test_config();
	let seed = entry(EntryType::Tool, "restic", "Snapshot tool.", 30);
	let related = entry(EntryType::Knowledge, "Rotation", "Keeps 7 dailies.", 10);
	let unrelated = entry(EntryType::Knowledge, "Restore", "Drill.", 1);
	let store = Arc::new(
		MemoryStore::new(vec![seed.clone(), related.clone(), unrelated]).with_edge(
			seed.key(),
			related.key(),
			"documents",
		),
	);
	let collaborators = collaborators(store);
	let deps = deps(&cfg, &collaborators);
	let request = memoria_service::QueryRequest {
		related_to: Some(RelatedTo {
			entry_type: "tool".to_string(),
			id: seed.id,
			relation: Some("documents".to_string()),
			direction: Some("forward".to_string()),
			depth: Some(1),
		}),
		..Default::default()
	};
	let ctx = execute(context(&cfg, &request), &Stage::ALL, &deps)
		.await
		.expect("Pipeline must succeed.");
	let ids = ctx.results.iter().map(|ranked| ranked.entry.id).collect::<Vec<_>>();

	assert_eq!(ids, vec![related.id]);
}
