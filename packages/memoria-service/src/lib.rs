//! Memory query pipeline: scope resolution, strategy selection, retrieval, ranking, and result
//! assembly over pluggable storage and model collaborators.

pub mod adapters;
pub mod cache;
pub mod collaborators;
pub mod deadline;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod pipeline;
pub mod request;
pub mod result;
pub mod scoring;
pub mod service;
pub mod stages;

pub use cache::{InMemoryResultCache, ResultCache};
pub use collaborators::{
	AdaptiveSignal, AdaptiveWeights, BoxFuture, Collaborators, EmbeddingCoverage,
	EmbeddingService, EntryQuery, EntryStore, FeedbackCounts, FeedbackService, LexicalHit,
	LexicalSearch, QueryDeps, RelationStore, RelevanceModel, SimilarHit, SummaryStore,
	VectorIndex,
};
pub use deadline::Deadline;
pub use error::{Error, Result};
pub use hierarchy::{
	DrillDown, HierarchicalEntry, HierarchicalResult, HierarchicalRetriever, RetrievalStep,
	RetrieveOptions,
};
pub use request::{NormalizedQuery, QueryRequest, RelatedTo, RelationSeed, TagFilter, ValidDuring};
pub use result::{QueryMeta, QueryResponse, QueryResultItem, build_query_result};
pub use service::MemoriaService;
