//! Seams between the pipeline and everything it reads from.
//!
//! Required collaborators (entry storage, lexical search, relations) always exist. The rest are
//! optional: a missing one disables the feature it backs without failing queries.

use std::{
	collections::HashMap,
	future::Future,
	pin::Pin,
	sync::Arc,
	time::Duration,
};

use time::OffsetDateTime;
use uuid::Uuid;

use memoria_config::Config;
use memoria_domain::{
	EntryKey, EntrySnapshot, EntryType, RelationDirection, RelationEdge, Scope, ScopeLevel,
	ScopeType, Summary, SummaryMember,
};

use crate::{Deadline, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How FETCH selects entries of one type.
#[derive(Clone, Copy, Debug)]
pub enum EntryQuery<'a> {
	Ids(&'a [Uuid]),
	Scopes { chain: &'a [ScopeLevel], limit: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LexicalHit {
	pub entry_type: EntryType,
	pub id: Uuid,
	/// Engine relevance, higher is better. Engines without a score leave this empty.
	pub score: Option<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimilarHit {
	pub entry_type: EntryType,
	pub id: Uuid,
	pub score: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmbeddingCoverage {
	pub total: u64,
	pub with_embeddings: u64,
}
impl EmbeddingCoverage {
	pub fn ratio(&self) -> f64 {
		if self.total == 0 {
			return 0.0;
		}

		self.with_embeddings as f64 / self.total as f64
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedbackCounts {
	pub positive: u32,
	pub negative: u32,
}

/// Learned per-entry signals, each expected in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdaptiveSignal {
	pub adaptive_weight: f64,
	pub usefulness: f64,
	pub context_similarity: f64,
}

pub trait EntryStore
where
	Self: Send + Sync,
{
	fn resolve_scope_chain<'a>(&'a self, scope: &'a Scope) -> BoxFuture<'a, Result<Vec<ScopeLevel>>>;

	fn fetch_entries<'a>(
		&'a self,
		entry_type: EntryType,
		query: EntryQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<EntrySnapshot>>>;

	fn tags_for_entries<'a>(
		&'a self,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<HashMap<Uuid, Vec<String>>>>;
}

pub trait LexicalSearch
where
	Self: Send + Sync,
{
	fn execute_fts5_search<'a>(
		&'a self,
		query: &'a str,
		types: &'a [EntryType],
		chain: &'a [ScopeLevel],
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<LexicalHit>>>;
}

pub trait EmbeddingService
where
	Self: Send + Sync,
{
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn search_similar<'a>(
		&'a self,
		vector: &'a [f32],
		types: &'a [EntryType],
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<SimilarHit>>>;

	fn embedding_coverage<'a>(
		&'a self,
		chain: &'a [ScopeLevel],
		types: &'a [EntryType],
	) -> BoxFuture<'a, Result<EmbeddingCoverage>>;
}

pub trait RelationStore
where
	Self: Send + Sync,
{
	/// Edges leaving (forward) or entering (backward) any key of `frontier`.
	fn neighbors<'a>(
		&'a self,
		frontier: &'a [EntryKey],
		direction: RelationDirection,
		relation_type: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RelationEdge>>>;
}

pub trait SummaryStore
where
	Self: Send + Sync,
{
	/// Summaries at the scope's highest hierarchy level, most accessed first.
	fn top_level<'a>(
		&'a self,
		scope_type: ScopeType,
		scope_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<Summary>>>;

	fn get_many<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Result<Vec<Summary>>>;

	fn children<'a>(&'a self, id: Uuid) -> BoxFuture<'a, Result<Vec<Summary>>>;

	fn members<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Result<Vec<SummaryMember>>>;

	/// Increments the access counter atomically and returns the updated row, if any.
	fn record_access<'a>(
		&'a self,
		id: Uuid,
		at: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<Summary>>>;
}

pub trait FeedbackService
where
	Self: Send + Sync,
{
	fn feedback_counts<'a>(
		&'a self,
		keys: &'a [EntryKey],
	) -> BoxFuture<'a, Result<HashMap<Uuid, FeedbackCounts>>>;
}

pub trait AdaptiveWeights
where
	Self: Send + Sync,
{
	fn signals<'a>(
		&'a self,
		query: &'a str,
		keys: &'a [EntryKey],
	) -> BoxFuture<'a, Result<HashMap<Uuid, AdaptiveSignal>>>;
}

/// Pairwise relevance model. Returns one score per document, higher is better.
pub trait RelevanceModel
where
	Self: Send + Sync,
{
	fn score<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>>;
}

#[derive(Clone)]
pub struct Collaborators {
	pub entries: Arc<dyn EntryStore>,
	pub lexical: Arc<dyn LexicalSearch>,
	pub relations: Arc<dyn RelationStore>,
	pub embeddings: Option<Arc<dyn EmbeddingService>>,
	pub vectors: Option<Arc<dyn VectorIndex>>,
	pub summaries: Option<Arc<dyn SummaryStore>>,
	pub feedback: Option<Arc<dyn FeedbackService>>,
	pub adaptive: Option<Arc<dyn AdaptiveWeights>>,
	pub rerank: Option<Arc<dyn RelevanceModel>>,
	pub cross_encoder: Option<Arc<dyn RelevanceModel>>,
}
impl Collaborators {
	pub fn new(
		entries: Arc<dyn EntryStore>,
		lexical: Arc<dyn LexicalSearch>,
		relations: Arc<dyn RelationStore>,
	) -> Self {
		Self {
			entries,
			lexical,
			relations,
			embeddings: None,
			vectors: None,
			summaries: None,
			feedback: None,
			adaptive: None,
			rerank: None,
			cross_encoder: None,
		}
	}

	pub fn with_embeddings(mut self, embeddings: Arc<dyn EmbeddingService>) -> Self {
		self.embeddings = Some(embeddings);

		self
	}

	pub fn with_vectors(mut self, vectors: Arc<dyn VectorIndex>) -> Self {
		self.vectors = Some(vectors);

		self
	}

	pub fn with_summaries(mut self, summaries: Arc<dyn SummaryStore>) -> Self {
		self.summaries = Some(summaries);

		self
	}

	pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackService>) -> Self {
		self.feedback = Some(feedback);

		self
	}

	pub fn with_adaptive(mut self, adaptive: Arc<dyn AdaptiveWeights>) -> Self {
		self.adaptive = Some(adaptive);

		self
	}

	pub fn with_rerank(mut self, rerank: Arc<dyn RelevanceModel>) -> Self {
		self.rerank = Some(rerank);

		self
	}

	pub fn with_cross_encoder(mut self, cross_encoder: Arc<dyn RelevanceModel>) -> Self {
		self.cross_encoder = Some(cross_encoder);

		self
	}
}

/// Everything one pipeline run may touch. Built per request; holds no process-wide state.
pub struct QueryDeps<'a> {
	pub cfg: &'a Config,
	pub collaborators: &'a Collaborators,
	pub deadline: Deadline,
}
impl<'a> QueryDeps<'a> {
	pub fn new(cfg: &'a Config, collaborators: &'a Collaborators, deadline: Deadline) -> Self {
		Self { cfg, collaborators, deadline }
	}

	pub fn collaborator_timeout(&self) -> Duration {
		Duration::from_millis(self.cfg.query.collaborator_timeout_ms)
	}
}
