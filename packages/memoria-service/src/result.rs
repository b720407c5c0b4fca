use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use memoria_domain::{EntryType, ScopeType};

use crate::pipeline::{PipelineContext, RankedEntry, Telemetry};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResultItem {
	pub id: Uuid,
	#[serde(rename = "type")]
	pub entry_type: EntryType,
	pub scope_type: ScopeType,
	pub scope_id: Option<String>,
	pub tags: Vec<String>,
	pub score: f64,
	pub payload: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
	/// Candidates before truncation, or -1 when unknown.
	pub total_count: i64,
	pub returned_count: usize,
	pub truncated: bool,
	pub has_more: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub next_cursor: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
	pub results: Vec<QueryResultItem>,
	pub meta: QueryMeta,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub telemetry: Option<Telemetry>,
}

/// Cuts the ranked pool down to `limit` in its existing order.
pub fn build_query_result(ctx: &PipelineContext) -> QueryResponse {
	let limit = ctx.params.limit;
	let candidates = ctx.total_candidates.unwrap_or(ctx.results.len());
	let results = ctx
		.results
		.iter()
		.take(limit)
		.map(|ranked| to_item(ranked, ctx.params.compact))
		.collect::<Vec<_>>();
	let truncated = candidates > limit;
	let next_cursor =
		truncated.then(|| encode_cursor(results.len(), ctx.cache_key.as_deref()));

	QueryResponse {
		meta: QueryMeta {
			total_count: ctx.total_candidates.map(|total| total as i64).unwrap_or(-1),
			returned_count: results.len(),
			truncated,
			has_more: truncated,
			next_cursor,
		},
		results,
		telemetry: ctx.telemetry.clone(),
	}
}

/// `<offset>:<first 12 hex chars of the cache key>`.
pub fn encode_cursor(offset: usize, cache_key: Option<&str>) -> String {
	let fingerprint = cache_key.map(|key| key.get(..12).unwrap_or(key)).unwrap_or("none");

	format!("{offset}:{fingerprint}")
}

fn to_item(ranked: &RankedEntry, compact: bool) -> QueryResultItem {
	let entry = &ranked.entry;
	let payload = if compact { entry.payload.compact() } else { entry.payload.to_value() };

	QueryResultItem {
		id: entry.id,
		entry_type: entry.entry_type,
		scope_type: entry.scope_type,
		scope_id: entry.scope_id.clone(),
		tags: ranked.tags.clone(),
		score: ranked.score,
		payload,
	}
}
