use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub query: Query,
	#[serde(default)]
	pub strategy: Strategy,
	#[serde(default)]
	pub rewrite: Rewrite,
	#[serde(default)]
	pub hierarchical: Hierarchical,
	#[serde(default)]
	pub semantic: Semantic,
	#[serde(default)]
	pub relations: Relations,
	#[serde(default)]
	pub scoring: Scoring,
	#[serde(default)]
	pub rerank: Rerank,
	#[serde(default)]
	pub cross_encoder: CrossEncoder,
	#[serde(default)]
	pub cache: Cache,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	pub cross_encoder: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Query {
	pub default_limit: u32,
	pub max_limit: u32,
	/// Scored pool kept for rerank stages is `ceil(limit * overscan_factor)`.
	pub overscan_factor: f32,
	/// Multiplier over the overscan pool used when fetching unconstrained candidates.
	pub fetch_headroom: u32,
	pub deadline_ms: u64,
	pub collaborator_timeout_ms: u64,
}
impl Default for Query {
	fn default() -> Self {
		Self {
			default_limit: 20,
			max_limit: 100,
			overscan_factor: 1.5,
			fetch_headroom: 3,
			deadline_ms: 5_000,
			collaborator_timeout_ms: 1_500,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Strategy {
	/// Minimum `with_embeddings / total` ratio (inclusive) for auto mode to pick hybrid.
	pub coverage_threshold: f64,
	pub coverage_timeout_ms: u64,
}
impl Default for Strategy {
	fn default() -> Self {
		Self { coverage_threshold: 0.8, coverage_timeout_ms: 500 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Rewrite {
	pub enabled: bool,
	pub detect_intent: bool,
	pub max_terms: u32,
}
impl Default for Rewrite {
	fn default() -> Self {
		Self { enabled: true, detect_intent: true, max_terms: 16 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Hierarchical {
	pub enabled: bool,
	pub beam_width: u32,
	pub max_results: u32,
	pub min_similarity: f32,
}
impl Default for Hierarchical {
	fn default() -> Self {
		Self { enabled: true, beam_width: 3, max_results: 50, min_similarity: 0.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Semantic {
	pub candidate_k: u32,
	pub min_score: f32,
}
impl Default for Semantic {
	fn default() -> Self {
		Self { candidate_k: 100, min_score: 0.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Relations {
	pub max_depth: u32,
	pub direction: String,
}
impl Default for Relations {
	fn default() -> Self {
		Self { max_depth: 2, direction: "both".to_string() }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Scoring {
	pub weights: ScoringWeights,
	pub recency: ScoringRecency,
	pub proximity: ScoringProximity,
	pub feedback: ScoringFeedback,
	pub entity: ScoringEntity,
	pub smart_priority: ScoringSmartPriority,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
	pub explicit_relation: f64,
	pub tag_match: f64,
	pub scope_proximity: f64,
	pub text_match: f64,
	pub priority_max: f64,
	pub semantic_max: f64,
	pub recency_max: f64,
	pub intent_boost: f64,
}
impl Default for ScoringWeights {
	fn default() -> Self {
		Self {
			explicit_relation: 5.0,
			tag_match: 3.0,
			scope_proximity: 2.0,
			text_match: 1.0,
			priority_max: 2.0,
			semantic_max: 4.0,
			recency_max: 1.0,
			intent_boost: 0.5,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringRecency {
	/// `exponential` (half-life) or `linear` (window).
	pub curve: String,
	pub half_life_days: f64,
	pub window_days: f64,
}
impl Default for ScoringRecency {
	fn default() -> Self {
		Self { curve: "exponential".to_string(), half_life_days: 14.0, window_days: 90.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringProximity {
	/// `linear`, `reciprocal`, or `exponential`.
	pub falloff: String,
	/// Per-hop multiplier for the exponential falloff.
	pub base: f64,
}
impl Default for ScoringProximity {
	fn default() -> Self {
		Self { falloff: "linear".to_string(), base: 0.5 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringFeedback {
	pub enabled: bool,
	pub boost_per_positive: f64,
	pub boost_max: f64,
	pub penalty_per_negative: f64,
	pub penalty_max: f64,
}
impl Default for ScoringFeedback {
	fn default() -> Self {
		Self {
			enabled: false,
			boost_per_positive: 0.1,
			boost_max: 0.5,
			penalty_per_negative: 0.15,
			penalty_max: 0.5,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringEntity {
	pub enabled: bool,
	pub exact_boost: f64,
	pub partial_boost: f64,
}
impl Default for ScoringEntity {
	fn default() -> Self {
		Self { enabled: false, exact_boost: 0.3, partial_boost: 0.15 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringSmartPriority {
	pub enabled: bool,
	pub weight: f64,
	pub adaptive_weight: f64,
	pub usefulness_weight: f64,
	pub context_weight: f64,
}
impl Default for ScoringSmartPriority {
	fn default() -> Self {
		Self {
			enabled: false,
			weight: 1.0,
			adaptive_weight: 0.5,
			usefulness_weight: 0.3,
			context_weight: 0.2,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub enabled: bool,
	pub top_n: u32,
	/// Share of the final score taken from the rerank model.
	pub alpha: f64,
}
impl Default for Rerank {
	fn default() -> Self {
		Self { enabled: false, top_n: 30, alpha: 0.5 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CrossEncoder {
	pub enabled: bool,
	pub top_n: u32,
	pub alpha: f64,
}
impl Default for CrossEncoder {
	fn default() -> Self {
		Self { enabled: false, top_n: 15, alpha: 0.6 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	pub ttl_secs: u64,
	pub max_entries: u32,
}
impl Default for Cache {
	fn default() -> Self {
		Self { enabled: true, ttl_secs: 60, max_entries: 512 }
	}
}
