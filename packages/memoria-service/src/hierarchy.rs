//! Beam search over the summary tree.
//!
//! Summaries form a forest per scope. Retrieval starts at the scope's top level, keeps the
//! `beam_width` summaries most similar to the query at each level, and descends through their
//! summary-typed members until it reaches level-0 summaries, whose entry members become the
//! result.

use std::{
	cmp::Ordering,
	collections::HashMap,
	future::Future,
	sync::Arc,
	time::{Duration, Instant},
};

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use memoria_config::Hierarchical;
use memoria_domain::{EntryType, MemberType, ScopeType, Summary, SummaryMember};

use crate::{
	Deadline, Error, Result,
	collaborators::{EmbeddingService, SummaryStore},
	stages::degradable,
};

#[derive(Clone, Debug)]
pub struct RetrieveOptions {
	/// Restricts returned members to these types. `None` keeps every entry type.
	pub entry_types: Option<Vec<EntryType>>,
	pub beam_width: usize,
	pub max_results: usize,
	pub min_similarity: f32,
	/// Reuses an embedding computed by the caller instead of embedding the query again.
	pub query_embedding: Option<Vec<f32>>,
	pub deadline: Option<Deadline>,
	pub call_timeout: Duration,
}
impl RetrieveOptions {
	pub fn from_config(cfg: &Hierarchical, call_timeout: Duration) -> Self {
		Self {
			entry_types: None,
			beam_width: cfg.beam_width as usize,
			max_results: cfg.max_results as usize,
			min_similarity: cfg.min_similarity,
			query_embedding: None,
			deadline: None,
			call_timeout,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct HierarchicalEntry {
	pub entry_type: EntryType,
	pub id: Uuid,
	pub contribution_score: f32,
	pub summary_id: Uuid,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalStep {
	pub level: u32,
	pub time_ms: f64,
	pub summaries_searched: usize,
}

#[derive(Clone, Debug, Default)]
pub struct HierarchicalResult {
	pub entries: Vec<HierarchicalEntry>,
	pub steps: Vec<RetrievalStep>,
	pub total_time_ms: f64,
	pub query_embedding: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillDown {
	pub summary: Summary,
	pub children: Vec<Summary>,
	pub members: Vec<SummaryMember>,
}

pub struct HierarchicalRetriever {
	summaries: Arc<dyn SummaryStore>,
	embeddings: Option<Arc<dyn EmbeddingService>>,
}
impl HierarchicalRetriever {
	pub fn new(
		summaries: Arc<dyn SummaryStore>,
		embeddings: Option<Arc<dyn EmbeddingService>>,
	) -> Self {
		Self { summaries, embeddings }
	}

	/// Never fails because a collaborator is unavailable: a missing embedding yields an empty
	/// result and a failure mid-descent returns what was collected so far.
	pub async fn retrieve(
		&self,
		query: &str,
		scope_type: ScopeType,
		scope_id: Option<&str>,
		options: &RetrieveOptions,
	) -> Result<HierarchicalResult> {
		let started = Instant::now();
		let mut result = HierarchicalResult::default();

		if let Some(embedding) = self.query_embedding(query, options).await? {
			match degradable(
				self.guarded(options, "summary lookup", self.get_top_level(scope_type, scope_id))
					.await,
			)? {
				Ok(top) => {
					result.entries =
						self.descend(top, &embedding, options, &mut result.steps).await?;
				},
				Err(err) => tracing::warn!(error = %err, "Top-level summary lookup failed."),
			}

			result.query_embedding = Some(embedding);
		}

		result.total_time_ms = started.elapsed().as_secs_f64() * 1_000.0;

		Ok(result)
	}

	pub async fn get_top_level(
		&self,
		scope_type: ScopeType,
		scope_id: Option<&str>,
	) -> Result<Vec<Summary>> {
		let mut summaries = self.summaries.top_level(scope_type, scope_id).await?;

		summaries.sort_by(|a, b| b.access_count.cmp(&a.access_count));

		Ok(summaries)
	}

	/// Records the access, then returns the summary with its children and members.
	pub async fn drill_down(&self, summary_id: &str) -> Result<DrillDown> {
		let not_found = || Error::NotFound { message: format!("Summary not found: {summary_id}") };
		let id = Uuid::parse_str(summary_id.trim()).map_err(|_| not_found())?;
		let summary =
			self.summaries.record_access(id, OffsetDateTime::now_utc()).await?.ok_or_else(not_found)?;
		let children = self.summaries.children(id).await?;
		let members = self.summaries.members(&[id]).await?;

		Ok(DrillDown { summary, children, members })
	}

	async fn query_embedding(
		&self,
		query: &str,
		options: &RetrieveOptions,
	) -> Result<Option<Vec<f32>>> {
		if let Some(embedding) = &options.query_embedding {
			return Ok(Some(embedding.clone()));
		}

		let Some(embeddings) = self.embeddings.as_ref() else {
			return Ok(None);
		};

		match degradable(self.guarded(options, "query embedding", embeddings.embed(query)).await)? {
			Ok(embedding) if !embedding.is_empty() => Ok(Some(embedding)),
			Ok(_) => Ok(None),
			Err(err) => {
				tracing::warn!(error = %err, "Query embedding failed; skipping hierarchical retrieval.");

				Ok(None)
			},
		}
	}

	async fn descend(
		&self,
		top: Vec<Summary>,
		embedding: &[f32],
		options: &RetrieveOptions,
		steps: &mut Vec<RetrievalStep>,
	) -> Result<Vec<HierarchicalEntry>> {
		let beam_width = options.beam_width.max(1);
		let mut level_summaries = top;

		loop {
			if level_summaries.is_empty() {
				return Ok(Vec::new());
			}

			let step_started = Instant::now();
			let searched = level_summaries.len();
			let level = level_summaries.iter().map(|summary| summary.hierarchy_level).max().unwrap_or(0);
			let beam = select_beam(level_summaries, embedding, beam_width, options.min_similarity);

			steps.push(RetrievalStep {
				level,
				time_ms: step_started.elapsed().as_secs_f64() * 1_000.0,
				summaries_searched: searched,
			});

			if beam.is_empty() {
				return Ok(Vec::new());
			}
			if level == 0 {
				return self.collect_members(&beam, options).await;
			}

			let beam_ids = beam.iter().map(|(summary, _)| summary.id).collect::<Vec<_>>();

			level_summaries = match self.next_level(&beam_ids, options).await? {
				Ok(next) => next,
				Err(err) => {
					tracing::warn!(error = %err, level, "Summary descent stopped early.");

					return Ok(Vec::new());
				},
			};
		}
	}

	/// Loads the summary-typed members of the beam, which form the next level's candidates.
	async fn next_level(
		&self,
		beam_ids: &[Uuid],
		options: &RetrieveOptions,
	) -> Result<Result<Vec<Summary>>> {
		let members = match degradable(
			self.guarded(options, "summary members", self.summaries.members(beam_ids)).await,
		)? {
			Ok(members) => members,
			Err(err) => return Ok(Err(err)),
		};
		let mut ids = Vec::new();

		for member in members {
			if member.member_type == MemberType::Summary && !ids.contains(&member.member_id) {
				ids.push(member.member_id);
			}
		}

		if ids.is_empty() {
			return Ok(Ok(Vec::new()));
		}

		degradable(self.guarded(options, "summary lookup", self.summaries.get_many(&ids)).await)
	}

	async fn collect_members(
		&self,
		beam: &[(Summary, f32)],
		options: &RetrieveOptions,
	) -> Result<Vec<HierarchicalEntry>> {
		let ids = beam.iter().map(|(summary, _)| summary.id).collect::<Vec<_>>();
		let members = match degradable(
			self.guarded(options, "summary members", self.summaries.members(&ids)).await,
		)? {
			Ok(members) => members,
			Err(err) => {
				tracing::warn!(error = %err, "Summary member lookup failed.");

				return Ok(Vec::new());
			},
		};
		let mut best: HashMap<(EntryType, Uuid), HierarchicalEntry> = HashMap::new();

		for member in members {
			let MemberType::Entry(entry_type) = member.member_type else {
				continue;
			};

			if let Some(types) = &options.entry_types
				&& !types.contains(&entry_type)
			{
				continue;
			}

			let candidate = HierarchicalEntry {
				entry_type,
				id: member.member_id,
				contribution_score: member.contribution_score,
				summary_id: member.summary_id,
			};

			best.entry((entry_type, member.member_id))
				.and_modify(|existing| {
					if candidate.contribution_score > existing.contribution_score {
						*existing = candidate.clone();
					}
				})
				.or_insert(candidate);
		}

		let mut entries = best.into_values().collect::<Vec<_>>();

		entries.sort_by(|a, b| {
			b.contribution_score
				.partial_cmp(&a.contribution_score)
				.unwrap_or(Ordering::Equal)
				.then_with(|| a.id.cmp(&b.id))
		});
		entries.truncate(options.max_results);

		Ok(entries)
	}

	async fn guarded<F, T>(&self, options: &RetrieveOptions, operation: &'static str, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		match &options.deadline {
			Some(deadline) => deadline.call(operation, options.call_timeout, fut).await,
			None => fut.await,
		}
	}
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn select_beam(
	summaries: Vec<Summary>,
	embedding: &[f32],
	beam_width: usize,
	min_similarity: f32,
) -> Vec<(Summary, f32)> {
	let mut scored = summaries
		.into_iter()
		.filter_map(|summary| {
			if summary.embedding.is_empty() {
				return None;
			}

			let similarity = cosine_similarity(&summary.embedding, embedding);

			(similarity >= min_similarity).then_some((summary, similarity))
		})
		.collect::<Vec<_>>();

	scored.sort_by(|(a, a_sim), (b, b_sim)| {
		b_sim.partial_cmp(a_sim).unwrap_or(Ordering::Equal).then_with(|| a.id.cmp(&b.id))
	});
	scored.truncate(beam_width);

	scored
}
