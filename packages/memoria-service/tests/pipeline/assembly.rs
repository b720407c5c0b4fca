use serde_json::json;

use memoria_domain::EntryType;
use memoria_service::{
	QueryRequest, build_query_result,
	pipeline::{PipelineContext, RankedEntry},
};

use super::{context, entry, test_config};

fn ranked_context(request: &QueryRequest, count: usize) -> PipelineContext {
	let cfg = test_config();
	let mut ctx = context(&cfg, request);

	ctx.results = (0..count)
		.map(|index| RankedEntry {
			entry: entry(EntryType::Tool, &format!("tool-{index}"), "Does things.", index as i64),
			tags: vec!["ops".to_string()],
			score: 10.0 - index as f64,
		})
		.collect();

	ctx
}

#[test]
fn short_result_sets_carry_no_cursor() {
	let mut ctx = ranked_context(&QueryRequest::default(), 3);

	ctx.total_candidates = Some(3);

	let response = build_query_result(&ctx);

	assert_eq!(response.meta.returned_count, 3);
	assert_eq!(response.meta.total_count, 3);
	assert!(!response.meta.truncated);
	assert!(!response.meta.has_more);
	assert!(response.meta.next_cursor.is_none());
	assert_eq!(response.results[0].tags, vec!["ops".to_string()]);
}

#[test]
fn unknown_total_is_reported_as_negative_one() {
	let response = build_query_result(&ranked_context(&QueryRequest::default(), 2));

	assert_eq!(response.meta.total_count, -1);
	assert_eq!(response.meta.returned_count, 2);
}

#[test]
fn truncation_emits_a_cursor_at_the_returned_offset() {
	let request = QueryRequest { limit: Some(2), ..Default::default() };
	let mut ctx = ranked_context(&request, 3);

	ctx.total_candidates = Some(5);
	ctx.cache_key = Some("0123456789abcdef".to_string());

	let response = build_query_result(&ctx);

	assert_eq!(response.results.len(), 2);
	assert!(response.meta.truncated);
	assert!(response.meta.has_more);
	assert_eq!(response.meta.next_cursor.as_deref(), Some("2:0123456789ab"));
}

#[test]
fn compact_payload_keeps_summary_fields_only() {
	let request = QueryRequest { compact: true, ..Default::default() };
	let response = build_query_result(&ranked_context(&request, 1));

	assert_eq!(response.results[0].payload, json!({ "name": "tool-0" }));

	let full = build_query_result(&ranked_context(&QueryRequest::default(), 1));

	assert_eq!(full.results[0].payload, json!({ "name": "tool-0", "content": "Does things." }));
}

#[test]
fn serialized_items_use_wire_names() {
	let response = build_query_result(&ranked_context(&QueryRequest::default(), 1));
	let value = serde_json::to_value(&response).expect("Response must serialize.");

	assert_eq!(value["results"][0]["type"], json!("tool"));
	assert_eq!(value["meta"]["returnedCount"], json!(1));
	assert!(value["meta"].get("nextCursor").is_none());
	assert!(value.get("telemetry").is_none());
}
