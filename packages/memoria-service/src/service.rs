use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tracing::Instrument;

use memoria_config::Config;

use crate::{
	Collaborators, Deadline, Error, QueryDeps, QueryRequest, Result,
	cache::{InMemoryResultCache, ResultCache},
	hierarchy::{DrillDown, HierarchicalRetriever},
	pipeline::{
		PipelineContext, Stage, execute, finalize_telemetry, initialize_telemetry,
		record_decision,
	},
	result::{QueryResponse, build_query_result},
};

pub struct MemoriaService {
	pub cfg: Config,
	pub collaborators: Collaborators,
	pub cache: Option<Arc<dyn ResultCache>>,
}
impl MemoriaService {
	/// Builds the service with the in-memory result cache when `[cache]` enables it.
	pub fn new(cfg: Config, collaborators: Collaborators) -> Self {
		let cache = cfg
			.cache
			.enabled
			.then(|| Arc::new(InMemoryResultCache::from_config(&cfg.cache)) as Arc<dyn ResultCache>);

		Self { cfg, collaborators, cache }
	}

	pub fn with_cache(mut self, cache: Option<Arc<dyn ResultCache>>) -> Self {
		self.cache = cache;

		self
	}

	pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
		let deadline = Deadline::after(Duration::from_millis(self.cfg.query.deadline_ms));

		self.query_with_deadline(request, deadline).await
	}

	/// Runs one query under a caller-owned deadline. Cancelling any clone of `deadline` stops the
	/// pipeline at the next stage or collaborator boundary.
	pub async fn query_with_deadline(
		&self,
		request: &QueryRequest,
		deadline: Deadline,
	) -> Result<QueryResponse> {
		let params = request.normalize(&self.cfg)?;
		let cache_key = params.cache_key()?;
		let span = tracing::info_span!(
			"memory_query",
			cache_key = &cache_key[..cache_key.len().min(12)],
			limit = params.limit,
		);

		async move {
			let telemetry = params.telemetry;
			let mut ctx = PipelineContext::new(params, OffsetDateTime::now_utc());

			ctx.cache_key = Some(cache_key.clone());

			if telemetry {
				ctx = initialize_telemetry(ctx);
			}

			if let Some(cache) = &self.cache
				&& let Some(hit) = cache.get(&cache_key)
			{
				tracing::debug!("Query served from cache.");

				ctx.cache_hit = true;
				ctx = finalize_telemetry(record_decision(ctx, "cacheHit", true));

				let mut response = (*hit).clone();

				response.telemetry = ctx.telemetry;

				return Ok(response);
			}

			let deps = QueryDeps::new(&self.cfg, &self.collaborators, deadline);
			let ctx = execute(ctx, &Stage::ALL, &deps).await?;
			let ctx = finalize_telemetry(ctx);
			let response = build_query_result(&ctx);

			tracing::info!(
				strategy = ctx.strategy().as_str(),
				returned = response.meta.returned_count,
				total = response.meta.total_count,
				"Query completed."
			);

			if let Some(cache) = &self.cache {
				let mut cached = response.clone();

				cached.telemetry = None;

				cache.put(cache_key, Arc::new(cached));
			}

			Ok(response)
		}
		.instrument(span)
		.await
	}

	pub fn hierarchical_retriever(&self) -> Option<HierarchicalRetriever> {
		let summaries = self.collaborators.summaries.clone()?;

		Some(HierarchicalRetriever::new(summaries, self.collaborators.embeddings.clone()))
	}

	pub async fn drill_down(&self, summary_id: &str) -> Result<DrillDown> {
		let retriever = self.hierarchical_retriever().ok_or(Error::CollaboratorUnavailable {
			collaborator: "summary store",
			message: "No summary store is configured.".to_string(),
		})?;

		retriever.drill_down(summary_id).await
	}
}
