//! Pairwise relevance rating through a chat-completions model.
//!
//! The model sees the query and a numbered list of candidates and answers with
//! `{"scores": [..]}`, one 0-10 rating per candidate. Ratings are mapped into
//! `0.0..=1.0`.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 3;
const MAX_RATING: f64 = 10.0;
const SYSTEM_PROMPT: &str = "You rate how relevant each numbered memory entry is to the user's query. \
Respond with a JSON object {\"scores\": [..]} holding one number from 0 (unrelated) to 10 \
(directly answers the query) per entry, in the order given. Output JSON only.";

pub async fn score(
	cfg: &memoria_config::LlmProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	if docs.is_empty() {
		return Ok(Vec::new());
	}

	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let messages = build_messages(query, docs);

	for _ in 0..MAX_ATTEMPTS {
		let body = serde_json::json!({
			"model": cfg.model,
			"temperature": cfg.temperature,
			"response_format": { "type": "json_object" },
			"messages": messages,
		});
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		if let Ok(scores) = parse_scores(json, docs.len()) {
			return Ok(scores);
		}
	}

	Err(Error::InvalidResponse {
		message: "Cross-encoder response did not contain one score per entry.".to_string(),
	})
}

fn build_messages(query: &str, docs: &[String]) -> Vec<Value> {
	let mut listing = String::new();

	for (idx, doc) in docs.iter().enumerate() {
		listing.push_str(&format!("[{idx}] {doc}\n"));
	}

	vec![
		serde_json::json!({ "role": "system", "content": SYSTEM_PROMPT }),
		serde_json::json!({
			"role": "user",
			"content": format!("Query: {query}\n\nEntries:\n{listing}"),
		}),
	]
}

fn parse_scores(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Cross-encoder response is missing message content.".to_string(),
		})?;
	let parsed: Value = serde_json::from_str(content)?;
	let raw = parsed.get("scores").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Cross-encoder content is missing scores.".to_string() }
	})?;

	if raw.len() != doc_count {
		return Err(Error::InvalidResponse {
			message: format!("Cross-encoder returned {} scores for {doc_count} entries.", raw.len()),
		});
	}

	raw.iter()
		.map(|value| {
			value
				.as_f64()
				.map(|rating| (rating.clamp(0.0, MAX_RATING) / MAX_RATING) as f32)
				.ok_or_else(|| Error::InvalidResponse {
					message: "Cross-encoder scores must be numeric.".to_string(),
				})
		})
		.collect()
}
