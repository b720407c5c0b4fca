//! Collaborator implementations backed by Postgres, Qdrant, and the HTTP providers.
//!
//! Optional collaborators report every backend failure as `CollaboratorUnavailable` so the
//! stage that uses them degrades. Required collaborators keep the storage error mapping.

use std::{collections::HashMap, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use memoria_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use memoria_domain::{
	EntryKey, EntrySnapshot, EntryType, RelationDirection, RelationEdge, Scope, ScopeLevel,
	ScopeType, Summary, SummaryMember,
};
use memoria_providers::{cross_encoder, embedding, rerank};
use memoria_storage::{db::Db, qdrant::QdrantStore, queries};

use crate::{
	Error, Result,
	collaborators::{
		BoxFuture, Collaborators, EmbeddingCoverage, EmbeddingService, EntryQuery, EntryStore,
		LexicalHit, LexicalSearch, RelationStore, RelevanceModel, SimilarHit, SummaryStore,
		VectorIndex,
	},
};

fn unavailable(collaborator: &'static str, err: impl Into<Error>) -> Error {
	match err.into() {
		Error::Storage { message } | Error::Provider { message } =>
			Error::CollaboratorUnavailable { collaborator, message },
		other => other,
	}
}

/// Builds the full collaborator set for a connected deployment.
pub fn default_collaborators(cfg: &Config, db: Arc<Db>, qdrant: Arc<QdrantStore>) -> Collaborators {
	let entries = Arc::new(PgEntryStore { db: db.clone() });
	let relations = Arc::new(PgRelationStore { db: db.clone() });
	let lexical = Arc::new(PgLexicalSearch { db: db.clone() });

	Collaborators::new(entries, lexical, relations)
		.with_vectors(Arc::new(StorageVectorIndex { db: db.clone(), qdrant }))
		.with_summaries(Arc::new(PgSummaryStore { db }))
		.with_embeddings(Arc::new(ProviderEmbedding { cfg: cfg.providers.embedding.clone() }))
		.with_rerank(Arc::new(ProviderRerank { cfg: cfg.providers.rerank.clone() }))
		.with_cross_encoder(Arc::new(ProviderCrossEncoder {
			cfg: cfg.providers.cross_encoder.clone(),
		}))
}

pub struct PgEntryStore {
	pub db: Arc<Db>,
}
impl EntryStore for PgEntryStore {
	fn resolve_scope_chain<'a>(&'a self, scope: &'a Scope) -> BoxFuture<'a, Result<Vec<ScopeLevel>>> {
		Box::pin(async move { Ok(queries::resolve_scope_chain(&self.db, scope).await?) })
	}

	fn fetch_entries<'a>(
		&'a self,
		entry_type: EntryType,
		query: EntryQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<EntrySnapshot>>> {
		Box::pin(async move {
			let entries = match query {
				EntryQuery::Ids(ids) => queries::fetch_entries_by_ids(&self.db, entry_type, ids).await?,
				EntryQuery::Scopes { chain, limit } =>
					queries::fetch_entries_in_scopes(&self.db, entry_type, chain, limit as i64)
						.await?,
			};

			Ok(entries)
		})
	}

	fn tags_for_entries<'a>(
		&'a self,
		ids: &'a [Uuid],
	) -> BoxFuture<'a, Result<HashMap<Uuid, Vec<String>>>> {
		Box::pin(async move { Ok(queries::tags_for_entries(&self.db, ids).await?) })
	}
}

pub struct PgLexicalSearch {
	pub db: Arc<Db>,
}
impl LexicalSearch for PgLexicalSearch {
	fn execute_fts5_search<'a>(
		&'a self,
		query: &'a str,
		types: &'a [EntryType],
		chain: &'a [ScopeLevel],
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<LexicalHit>>> {
		Box::pin(async move {
			let hits = queries::fts_search(&self.db, query, types, chain, limit as i64).await?;

			Ok(hits
				.into_iter()
				.filter_map(|hit| {
					Some(LexicalHit {
						entry_type: EntryType::parse(&hit.entry_type)?,
						id: hit.entry_id,
						score: Some(hit.rank),
					})
				})
				.collect())
		})
	}
}

pub struct PgRelationStore {
	pub db: Arc<Db>,
}
impl RelationStore for PgRelationStore {
	fn neighbors<'a>(
		&'a self,
		frontier: &'a [EntryKey],
		direction: RelationDirection,
		relation_type: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RelationEdge>>> {
		Box::pin(async move {
			let keys = frontier.iter().map(|key| (key.entry_type, key.id)).collect::<Vec<_>>();

			Ok(queries::relation_edges(&self.db, &keys, direction, relation_type).await?)
		})
	}
}

pub struct PgSummaryStore {
	pub db: Arc<Db>,
}
impl SummaryStore for PgSummaryStore {
	fn top_level<'a>(
		&'a self,
		scope_type: ScopeType,
		scope_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<Summary>>> {
		Box::pin(async move {
			queries::top_level_summaries(&self.db, scope_type, scope_id)
				.await
				.map_err(|err| unavailable("summary store", err))
		})
	}

	fn get_many<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Result<Vec<Summary>>> {
		Box::pin(async move {
			queries::get_summaries(&self.db, ids)
				.await
				.map_err(|err| unavailable("summary store", err))
		})
	}

	fn children<'a>(&'a self, id: Uuid) -> BoxFuture<'a, Result<Vec<Summary>>> {
		Box::pin(async move {
			queries::child_summaries(&self.db, id)
				.await
				.map_err(|err| unavailable("summary store", err))
		})
	}

	fn members<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Result<Vec<SummaryMember>>> {
		Box::pin(async move {
			queries::summary_members(&self.db, ids)
				.await
				.map_err(|err| unavailable("summary store", err))
		})
	}

	fn record_access<'a>(
		&'a self,
		id: Uuid,
		at: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<Summary>>> {
		Box::pin(async move { Ok(queries::record_summary_access(&self.db, id, at).await?) })
	}
}

/// Similarity from Qdrant, coverage counts from Postgres.
pub struct StorageVectorIndex {
	pub db: Arc<Db>,
	pub qdrant: Arc<QdrantStore>,
}
impl VectorIndex for StorageVectorIndex {
	fn search_similar<'a>(
		&'a self,
		vector: &'a [f32],
		types: &'a [EntryType],
		limit: usize,
	) -> BoxFuture<'a, Result<Vec<SimilarHit>>> {
		Box::pin(async move {
			let hits = self
				.qdrant
				.search_similar(vector, types, limit as u64)
				.await
				.map_err(|err| unavailable("vector index", err))?;

			Ok(hits
				.into_iter()
				.map(|hit| SimilarHit { entry_type: hit.entry_type, id: hit.entry_id, score: hit.score })
				.collect())
		})
	}

	fn embedding_coverage<'a>(
		&'a self,
		chain: &'a [ScopeLevel],
		types: &'a [EntryType],
	) -> BoxFuture<'a, Result<EmbeddingCoverage>> {
		Box::pin(async move {
			let coverage = queries::embedding_coverage(&self.db, types, chain)
				.await
				.map_err(|err| unavailable("embedding coverage", err))?;

			Ok(EmbeddingCoverage {
				total: coverage.total.max(0) as u64,
				with_embeddings: coverage.with_embeddings.max(0) as u64,
			})
		})
	}
}

pub struct ProviderEmbedding {
	pub cfg: EmbeddingProviderConfig,
}
impl EmbeddingService for ProviderEmbedding {
	fn embed<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			let vectors = embedding::embed(&self.cfg, &[text.to_string()])
				.await
				.map_err(|err| unavailable("embedding", err))?;

			vectors.into_iter().next().ok_or_else(|| Error::CollaboratorUnavailable {
				collaborator: "embedding",
				message: "Embedding provider returned no vectors.".to_string(),
			})
		})
	}
}

pub struct ProviderRerank {
	pub cfg: ProviderConfig,
}
impl RelevanceModel for ProviderRerank {
	fn score<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			rerank::rerank(&self.cfg, query, docs)
				.await
				.map_err(|err| unavailable("rerank", err))
		})
	}
}

pub struct ProviderCrossEncoder {
	pub cfg: LlmProviderConfig,
}
impl RelevanceModel for ProviderCrossEncoder {
	fn score<'a>(&'a self, query: &'a str, docs: &'a [String]) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			cross_encoder::score(&self.cfg, query, docs)
				.await
				.map_err(|err| unavailable("cross-encoder", err))
		})
	}
}
