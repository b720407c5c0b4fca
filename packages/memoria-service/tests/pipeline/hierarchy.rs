use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use memoria_domain::{EntryType, MemberType, ScopeType, Summary, SummaryMember};
use memoria_service::{Error, HierarchicalRetriever, RetrieveOptions};

use super::{FakeEmbedding, FakeSummaries, test_config};

fn summary(level: u32, parent: Option<Uuid>, embedding: Vec<f32>) -> Summary {
	Summary {
		id: Uuid::new_v4(),
		scope_type: ScopeType::Global,
		scope_id: None,
		hierarchy_level: level,
		parent_summary_id: parent,
		title: format!("level {level}"),
		embedding,
		member_count: 1,
		access_count: 0,
		last_accessed_at: None,
	}
}

fn member(summary_id: Uuid, member_type: MemberType, member_id: Uuid, score: f32) -> SummaryMember {
	SummaryMember { summary_id, member_type, member_id, contribution_score: score }
}

fn options() -> RetrieveOptions {
	RetrieveOptions::from_config(&test_config().hierarchical, Duration::from_secs(1))
}

/// Three levels, 2 -> 1 -> 0, with one knowledge and one tool member at the leaf.
struct Tree {
	root: Summary,
	middle: Summary,
	leaf: Summary,
	knowledge_id: Uuid,
	tool_id: Uuid,
	store: Arc<FakeSummaries>,
}

fn three_level_tree() -> Tree {
	let root = summary(2, None, vec![1.0, 0.0]);
	let middle = summary(1, Some(root.id), vec![0.9, 0.1]);
	let off_topic = summary(1, Some(root.id), vec![0.0, 1.0]);
	let leaf = summary(0, Some(middle.id), vec![1.0, 0.1]);
	let knowledge_id = Uuid::new_v4();
	let tool_id = Uuid::new_v4();
	let members = vec![
		member(root.id, MemberType::Summary, middle.id, 1.0),
		member(root.id, MemberType::Summary, off_topic.id, 0.2),
		member(middle.id, MemberType::Summary, leaf.id, 1.0),
		member(leaf.id, MemberType::Entry(EntryType::Knowledge), knowledge_id, 0.9),
		member(leaf.id, MemberType::Entry(EntryType::Tool), tool_id, 0.4),
	];
	let store = Arc::new(FakeSummaries::new(
		vec![root.clone(), middle.clone(), off_topic, leaf.clone()],
		members,
	));

	Tree { root, middle, leaf, knowledge_id, tool_id, store }
}

#[tokio::test]
async fn descends_every_level_in_order() {
	let tree = three_level_tree();
	let retriever = HierarchicalRetriever::new(
		tree.store.clone(),
		Some(Arc::new(FakeEmbedding::returning(vec![1.0, 0.0]))),
	);
	let result = retriever
		.retrieve("postgres backups", ScopeType::Global, None, &options())
		.await
		.expect("Retrieval must succeed.");
	let levels = result.steps.iter().map(|step| step.level).collect::<Vec<_>>();

	assert_eq!(levels, vec![2, 1, 0]);
	assert_eq!(result.entries.len(), 2);
	assert_eq!(result.entries[0].id, tree.knowledge_id);
	assert_eq!(result.entries[0].summary_id, tree.leaf.id);
	assert_eq!(result.query_embedding, Some(vec![1.0, 0.0]));
	assert!(result.total_time_ms >= 0.0);
}

#[tokio::test]
async fn descent_follows_summary_members_without_parent_links() {
	let root = summary(2, None, vec![1.0, 0.0]);
	let middle = summary(1, None, vec![0.9, 0.1]);
	let unlinked = summary(1, None, vec![1.0, 0.0]);
	let leaf = summary(0, None, vec![1.0, 0.1]);
	let unlinked_leaf = summary(0, None, vec![1.0, 0.0]);
	let entry_id = Uuid::new_v4();
	let stray_id = Uuid::new_v4();
	let members = vec![
		member(root.id, MemberType::Summary, middle.id, 1.0),
		member(root.id, MemberType::Entry(EntryType::Knowledge), stray_id, 1.0),
		member(middle.id, MemberType::Summary, leaf.id, 1.0),
		member(leaf.id, MemberType::Entry(EntryType::Experience), entry_id, 0.7),
		member(unlinked.id, MemberType::Summary, unlinked_leaf.id, 1.0),
		member(unlinked_leaf.id, MemberType::Entry(EntryType::Experience), stray_id, 1.0),
	];
	let store = Arc::new(FakeSummaries::new(
		vec![root, middle, unlinked, leaf.clone(), unlinked_leaf],
		members,
	));
	let retriever = HierarchicalRetriever::new(store, None);
	let options = RetrieveOptions { query_embedding: Some(vec![1.0, 0.0]), ..options() };
	let result = retriever
		.retrieve("q", ScopeType::Global, None, &options)
		.await
		.expect("Retrieval must succeed.");
	let levels = result.steps.iter().map(|step| step.level).collect::<Vec<_>>();
	let searched = result.steps.iter().map(|step| step.summaries_searched).collect::<Vec<_>>();

	assert_eq!(levels, vec![2, 1, 0]);
	assert_eq!(searched, vec![1, 1, 1]);
	assert_eq!(result.entries.len(), 1);
	assert_eq!(result.entries[0].id, entry_id);
	assert_eq!(result.entries[0].summary_id, leaf.id);
}

#[tokio::test]
async fn failed_member_lookup_keeps_steps_and_timing() {
	let tree = three_level_tree();
	let store = FakeSummaries::new(
		tree.store.summaries.lock().expect("Lock summaries.").clone(),
		tree.store.members.clone(),
	)
	.with_failing_members(vec![tree.middle.id]);
	let retriever = HierarchicalRetriever::new(Arc::new(store), None);
	let options = RetrieveOptions { query_embedding: Some(vec![1.0, 0.0]), ..options() };
	let result = retriever
		.retrieve("q", ScopeType::Global, None, &options)
		.await
		.expect("Member outages must not fail retrieval.");
	let levels = result.steps.iter().map(|step| step.level).collect::<Vec<_>>();

	assert_eq!(levels, vec![2, 1]);
	assert!(result.entries.is_empty());
	assert!(result.total_time_ms > 0.0);
	assert_eq!(result.query_embedding, Some(vec![1.0, 0.0]));
}

#[tokio::test]
async fn entry_type_filter_is_strict() {
	let tree = three_level_tree();
	let retriever = HierarchicalRetriever::new(tree.store.clone(), None);
	let options = RetrieveOptions {
		entry_types: Some(vec![EntryType::Tool]),
		query_embedding: Some(vec![1.0, 0.0]),
		..options()
	};
	let result = retriever
		.retrieve("anything", ScopeType::Global, None, &options)
		.await
		.expect("Retrieval must succeed.");

	assert_eq!(result.entries.len(), 1);
	assert_eq!(result.entries[0].id, tree.tool_id);
}

#[tokio::test]
async fn supplied_embedding_skips_the_embedding_service() {
	let tree = three_level_tree();
	let embedding = Arc::new(FakeEmbedding::returning(vec![0.0, 1.0]));
	let retriever = HierarchicalRetriever::new(tree.store.clone(), Some(embedding.clone()));
	let options = RetrieveOptions { query_embedding: Some(vec![1.0, 0.0]), ..options() };

	retriever.retrieve("q", ScopeType::Global, None, &options).await.expect("Retrieval must succeed.");

	assert_eq!(embedding.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scope_without_summaries_yields_no_steps() {
	let tree = three_level_tree();
	let retriever = HierarchicalRetriever::new(
		tree.store.clone(),
		Some(Arc::new(FakeEmbedding::returning(vec![1.0, 0.0]))),
	);
	let result = retriever
		.retrieve("q", ScopeType::Project, Some("elsewhere"), &options())
		.await
		.expect("Retrieval must succeed.");

	assert!(result.entries.is_empty());
	assert!(result.steps.is_empty());
}

#[tokio::test]
async fn unavailable_embedding_returns_empty_result() {
	let tree = three_level_tree();
	let retriever =
		HierarchicalRetriever::new(tree.store.clone(), Some(Arc::new(FakeEmbedding::offline())));
	let result = retriever
		.retrieve("q", ScopeType::Global, None, &options())
		.await
		.expect("Unavailable embeddings must not fail retrieval.");

	assert!(result.entries.is_empty());
	assert!(result.steps.is_empty());
	assert!(result.total_time_ms >= 0.0);
}

#[tokio::test]
async fn drill_down_on_unknown_summary_is_not_found() {
	let retriever = HierarchicalRetriever::new(Arc::new(FakeSummaries::default()), None);
	let err = retriever.drill_down("missing-id").await.expect_err("Unknown ids must fail.");

	match err {
		Error::NotFound { message } => assert_eq!(message, "Summary not found: missing-id"),
		other => panic!("Unexpected error: {other}"),
	}

	let unknown = Uuid::new_v4().to_string();

	assert!(matches!(retriever.drill_down(&unknown).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn drill_down_tracks_access() {
	let tree = three_level_tree();
	let retriever = HierarchicalRetriever::new(tree.store.clone(), None);
	let drill = retriever.drill_down(&tree.root.id.to_string()).await.expect("Root exists.");

	assert_eq!(drill.summary.access_count, 1);
	assert_eq!(drill.children.len(), 2);
	assert_eq!(drill.members.len(), 2);
	assert!(drill.members.iter().all(|member| member.member_type == MemberType::Summary));

	retriever.drill_down(&tree.root.id.to_string()).await.expect("Root exists.");

	let stored = tree.store.snapshot(tree.root.id).expect("Root is stored.");

	assert_eq!(stored.access_count, 2);
	assert!(stored.last_accessed_at.is_some());
}
