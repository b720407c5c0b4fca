mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, CrossEncoder, EmbeddingProviderConfig, Hierarchical, LlmProviderConfig,
	Postgres, ProviderConfig, Providers, Qdrant, Query, Relations, Rerank, Rewrite, Scoring,
	ScoringEntity, ScoringFeedback, ScoringProximity, ScoringRecency, ScoringSmartPriority,
	ScoringWeights, Semantic, Service, Storage, Strategy,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("rerank", &cfg.providers.rerank.api_key),
		("cross_encoder", &cfg.providers.cross_encoder.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	validate_query(cfg)?;
	validate_stages(cfg)?;
	validate_scoring(&cfg.scoring)?;

	if cfg.cache.enabled {
		if cfg.cache.ttl_secs == 0 {
			return Err(Error::Validation {
				message: "cache.ttl_secs must be greater than zero.".to_string(),
			});
		}
		if cfg.cache.max_entries == 0 {
			return Err(Error::Validation {
				message: "cache.max_entries must be greater than zero.".to_string(),
			});
		}
	}

	Ok(())
}

fn validate_query(cfg: &Config) -> Result<()> {
	let query = &cfg.query;

	if query.default_limit == 0 {
		return Err(Error::Validation {
			message: "query.default_limit must be greater than zero.".to_string(),
		});
	}
	if query.max_limit < query.default_limit {
		return Err(Error::Validation {
			message: "query.max_limit must be at least query.default_limit.".to_string(),
		});
	}
	if !query.overscan_factor.is_finite() || query.overscan_factor < 1.0 {
		return Err(Error::Validation {
			message: "query.overscan_factor must be a finite number of at least 1.0.".to_string(),
		});
	}
	if query.fetch_headroom == 0 {
		return Err(Error::Validation {
			message: "query.fetch_headroom must be greater than zero.".to_string(),
		});
	}
	if query.deadline_ms == 0 {
		return Err(Error::Validation {
			message: "query.deadline_ms must be greater than zero.".to_string(),
		});
	}
	if query.collaborator_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "query.collaborator_timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_stages(cfg: &Config) -> Result<()> {
	if !(0.0..=1.0).contains(&cfg.strategy.coverage_threshold) {
		return Err(Error::Validation {
			message: "strategy.coverage_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.rewrite.max_terms == 0 {
		return Err(Error::Validation {
			message: "rewrite.max_terms must be greater than zero.".to_string(),
		});
	}
	if cfg.hierarchical.enabled {
		if cfg.hierarchical.beam_width == 0 {
			return Err(Error::Validation {
				message: "hierarchical.beam_width must be greater than zero.".to_string(),
			});
		}
		if cfg.hierarchical.max_results == 0 {
			return Err(Error::Validation {
				message: "hierarchical.max_results must be greater than zero.".to_string(),
			});
		}
	}
	if !(-1.0..=1.0).contains(&cfg.hierarchical.min_similarity) {
		return Err(Error::Validation {
			message: "hierarchical.min_similarity must be in the range -1.0-1.0.".to_string(),
		});
	}
	if cfg.semantic.candidate_k == 0 {
		return Err(Error::Validation {
			message: "semantic.candidate_k must be greater than zero.".to_string(),
		});
	}
	if !cfg.semantic.min_score.is_finite() {
		return Err(Error::Validation {
			message: "semantic.min_score must be a finite number.".to_string(),
		});
	}
	if cfg.relations.max_depth == 0 {
		return Err(Error::Validation {
			message: "relations.max_depth must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.relations.direction.as_str(), "forward" | "backward" | "both") {
		return Err(Error::Validation {
			message: "relations.direction must be one of forward, backward, or both.".to_string(),
		});
	}

	for (label, enabled, top_n, alpha) in [
		("rerank", cfg.rerank.enabled, cfg.rerank.top_n, cfg.rerank.alpha),
		("cross_encoder", cfg.cross_encoder.enabled, cfg.cross_encoder.top_n, cfg.cross_encoder.alpha),
	] {
		if enabled && top_n == 0 {
			return Err(Error::Validation {
				message: format!("{label}.top_n must be greater than zero."),
			});
		}
		if !(0.0..=1.0).contains(&alpha) {
			return Err(Error::Validation {
				message: format!("{label}.alpha must be in the range 0.0-1.0."),
			});
		}
	}

	Ok(())
}

fn validate_scoring(scoring: &Scoring) -> Result<()> {
	let weights = &scoring.weights;

	for (label, value) in [
		("explicit_relation", weights.explicit_relation),
		("tag_match", weights.tag_match),
		("scope_proximity", weights.scope_proximity),
		("text_match", weights.text_match),
		("priority_max", weights.priority_max),
		("semantic_max", weights.semantic_max),
		("recency_max", weights.recency_max),
		("intent_boost", weights.intent_boost),
	] {
		if !value.is_finite() {
			return Err(Error::Validation {
				message: format!("scoring.weights.{label} must be a finite number."),
			});
		}
		if value < 0.0 {
			return Err(Error::Validation {
				message: format!("scoring.weights.{label} must be zero or greater."),
			});
		}
	}

	let recency = &scoring.recency;

	if !matches!(recency.curve.as_str(), "exponential" | "linear") {
		return Err(Error::Validation {
			message: "scoring.recency.curve must be one of exponential or linear.".to_string(),
		});
	}
	if recency.curve == "exponential"
		&& (!recency.half_life_days.is_finite() || recency.half_life_days <= 0.0)
	{
		return Err(Error::Validation {
			message: "scoring.recency.half_life_days must be greater than zero.".to_string(),
		});
	}
	if recency.curve == "linear" && (!recency.window_days.is_finite() || recency.window_days <= 0.0)
	{
		return Err(Error::Validation {
			message: "scoring.recency.window_days must be greater than zero.".to_string(),
		});
	}
	if !matches!(scoring.proximity.falloff.as_str(), "linear" | "reciprocal" | "exponential") {
		return Err(Error::Validation {
			message: "scoring.proximity.falloff must be one of linear, reciprocal, or exponential."
				.to_string(),
		});
	}
	if !scoring.proximity.base.is_finite()
		|| scoring.proximity.base <= 0.0
		|| scoring.proximity.base >= 1.0
	{
		return Err(Error::Validation {
			message: "scoring.proximity.base must be between 0.0 and 1.0 exclusive.".to_string(),
		});
	}

	let feedback = &scoring.feedback;

	for (label, value) in [
		("boost_per_positive", feedback.boost_per_positive),
		("boost_max", feedback.boost_max),
		("penalty_per_negative", feedback.penalty_per_negative),
		("penalty_max", feedback.penalty_max),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("scoring.feedback.{label} must be a finite number of zero or greater."),
			});
		}
	}

	if feedback.penalty_max > 1.0 {
		return Err(Error::Validation {
			message: "scoring.feedback.penalty_max must be 1.0 or less.".to_string(),
		});
	}

	for (label, value) in [
		("entity.exact_boost", scoring.entity.exact_boost),
		("entity.partial_boost", scoring.entity.partial_boost),
		("smart_priority.weight", scoring.smart_priority.weight),
		("smart_priority.adaptive_weight", scoring.smart_priority.adaptive_weight),
		("smart_priority.usefulness_weight", scoring.smart_priority.usefulness_weight),
		("smart_priority.context_weight", scoring.smart_priority.context_weight),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("scoring.{label} must be a finite number of zero or greater."),
			});
		}
	}

	if scoring.entity.partial_boost > scoring.entity.exact_boost {
		return Err(Error::Validation {
			message: "scoring.entity.partial_boost must not exceed scoring.entity.exact_boost."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.relations.direction = cfg.relations.direction.trim().to_ascii_lowercase();
	cfg.scoring.recency.curve = cfg.scoring.recency.curve.trim().to_ascii_lowercase();
	cfg.scoring.proximity.falloff = cfg.scoring.proximity.falloff.trim().to_ascii_lowercase();
	cfg.service.log_level = cfg.service.log_level.trim().to_string();
}
