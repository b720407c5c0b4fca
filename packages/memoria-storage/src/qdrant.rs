use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, PointId, Query, QueryPointsBuilder, ScoredPoint, Value,
	point_id::PointIdOptions,
	value::Kind,
};
use uuid::Uuid;

use memoria_domain::EntryType;

use crate::Result;

pub const DENSE_VECTOR_NAME: &str = "dense";

/// One nearest-neighbour hit from the entry collection.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarEntry {
	pub entry_type: EntryType,
	pub entry_id: Uuid,
	pub score: f32,
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &memoria_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Nearest entries to `vector` among the given types, best first.
	pub async fn search_similar(
		&self,
		vector: &[f32],
		types: &[EntryType],
		limit: u64,
	) -> Result<Vec<SimilarEntry>> {
		let type_names: Vec<String> =
			types.iter().map(|entry_type| entry_type.as_str().to_string()).collect();
		let filter = Filter::all([Condition::matches("entry_type", type_names)]);
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.using(DENSE_VECTOR_NAME)
			.filter(filter)
			.with_payload(true)
			.limit(limit);
		let response = self.client.query(search).await?;
		let hits = response.result.iter().filter_map(similar_entry_from_point).collect::<Vec<_>>();

		if hits.len() < response.result.len() {
			tracing::warn!(
				collection = %self.collection,
				dropped = response.result.len() - hits.len(),
				"Skipped Qdrant points without a usable entry id or type."
			);
		}

		Ok(hits)
	}
}

fn similar_entry_from_point(point: &ScoredPoint) -> Option<SimilarEntry> {
	let entry_id = payload_uuid(&point.payload, "entry_id")
		.or_else(|| point.id.as_ref().and_then(point_id_to_uuid))?;
	let entry_type = payload_string(&point.payload, "entry_type")
		.as_deref()
		.and_then(EntryType::parse)?;

	Some(SimilarEntry { entry_type, entry_id, score: point.score })
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

fn payload_uuid(payload: &HashMap<String, Value>, key: &str) -> Option<Uuid> {
	payload_string(payload, key).and_then(|text| Uuid::parse_str(&text).ok())
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}
