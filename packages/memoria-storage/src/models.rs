use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use memoria_domain::{
	EntryPayload, EntrySnapshot, EntryType, MemberType, RelationEdge, ScopeType, Summary,
	SummaryMember,
};

use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
pub struct MemoryEntry {
	pub entry_id: Uuid,
	pub entry_type: String,
	pub scope_type: String,
	pub scope_id: Option<String>,
	pub name: String,
	pub content: String,
	pub category: Option<String>,
	pub priority: Option<i32>,
	pub level: Option<String>,
	pub payload: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub valid_from: Option<OffsetDateTime>,
	pub valid_until: Option<OffsetDateTime>,
}
impl TryFrom<MemoryEntry> for EntrySnapshot {
	type Error = Error;

	fn try_from(row: MemoryEntry) -> Result<Self> {
		let entry_type = parse_entry_type(&row.entry_type)?;
		let scope_type = parse_scope_type(&row.scope_type)?;
		let payload = EntryPayload::new(row.payload).ok_or_else(|| {
			Error::CorruptRow(format!("Entry {} payload must be a JSON object.", row.entry_id))
		})?;

		Ok(Self {
			id: row.entry_id,
			entry_type,
			scope_type,
			scope_id: row.scope_id,
			name: row.name,
			content: row.content,
			category: row.category,
			priority: row.priority,
			level: row.level,
			created_at: row.created_at,
			updated_at: row.updated_at,
			valid_from: row.valid_from,
			valid_until: row.valid_until,
			payload,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct EntryTag {
	pub entry_id: Uuid,
	pub tag: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct EntryRelation {
	pub source_type: String,
	pub source_id: Uuid,
	pub target_type: String,
	pub target_id: Uuid,
	pub relation_type: String,
}
impl TryFrom<EntryRelation> for RelationEdge {
	type Error = Error;

	fn try_from(row: EntryRelation) -> Result<Self> {
		Ok(Self {
			source_type: parse_entry_type(&row.source_type)?,
			source_id: row.source_id,
			target_type: parse_entry_type(&row.target_type)?,
			target_id: row.target_id,
			relation_type: row.relation_type,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct SummaryRow {
	pub summary_id: Uuid,
	pub scope_type: String,
	pub scope_id: Option<String>,
	pub hierarchy_level: i32,
	pub parent_summary_id: Option<Uuid>,
	pub title: String,
	pub embedding: Vec<f32>,
	pub member_count: i32,
	pub access_count: i64,
	pub last_accessed_at: Option<OffsetDateTime>,
}
impl TryFrom<SummaryRow> for Summary {
	type Error = Error;

	fn try_from(row: SummaryRow) -> Result<Self> {
		Ok(Self {
			id: row.summary_id,
			scope_type: parse_scope_type(&row.scope_type)?,
			scope_id: row.scope_id,
			hierarchy_level: u32::try_from(row.hierarchy_level).map_err(|_| {
				Error::CorruptRow(format!("Summary {} has a negative level.", row.summary_id))
			})?,
			parent_summary_id: row.parent_summary_id,
			title: row.title,
			embedding: row.embedding,
			member_count: u32::try_from(row.member_count).unwrap_or(0),
			access_count: u64::try_from(row.access_count).unwrap_or(0),
			last_accessed_at: row.last_accessed_at,
		})
	}
}

#[derive(Debug, sqlx::FromRow)]
pub struct SummaryMemberRow {
	pub summary_id: Uuid,
	pub member_type: String,
	pub member_id: Uuid,
	pub contribution_score: f32,
}
impl TryFrom<SummaryMemberRow> for SummaryMember {
	type Error = Error;

	fn try_from(row: SummaryMemberRow) -> Result<Self> {
		let member_type = MemberType::parse(&row.member_type).ok_or_else(|| {
			Error::CorruptRow(format!("Unknown summary member type {:?}.", row.member_type))
		})?;

		Ok(Self {
			summary_id: row.summary_id,
			member_type,
			member_id: row.member_id,
			contribution_score: row.contribution_score,
		})
	}
}

/// Embedding coverage counts for a set of entry types within a scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct EmbeddingCoverage {
	pub total: i64,
	pub with_embeddings: i64,
}

fn parse_entry_type(raw: &str) -> Result<EntryType> {
	EntryType::parse(raw).ok_or_else(|| Error::CorruptRow(format!("Unknown entry type {raw:?}.")))
}

fn parse_scope_type(raw: &str) -> Result<ScopeType> {
	ScopeType::parse(raw).ok_or_else(|| Error::CorruptRow(format!("Unknown scope type {raw:?}.")))
}
