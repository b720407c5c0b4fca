//! Row writers for integration tests. Production writes go through the entry repositories, which
//! live outside this workspace.

use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use memoria_domain::{EntrySnapshot, EntryType, MemberType, ScopeType};

use crate::Result;

pub async fn insert_project(pool: &PgPool, project_id: &str, org_id: Option<&str>) -> Result<()> {
	if let Some(org_id) = org_id {
		sqlx::query("INSERT INTO orgs (org_id, name) VALUES ($1, $1) ON CONFLICT DO NOTHING")
			.bind(org_id)
			.execute(pool)
			.await?;
	}

	sqlx::query(
		"INSERT INTO projects (project_id, org_id, name) VALUES ($1, $2, $1) ON CONFLICT DO NOTHING",
	)
	.bind(project_id)
	.bind(org_id)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn insert_session(pool: &PgPool, session_id: &str, project_id: &str) -> Result<()> {
	sqlx::query(
		"INSERT INTO sessions (session_id, project_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
	)
	.bind(session_id)
	.bind(project_id)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn insert_entry(pool: &PgPool, entry: &EntrySnapshot, tags: &[&str]) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO memory_entries (
	entry_id,
	entry_type,
	scope_type,
	scope_id,
	name,
	content,
	category,
	priority,
	level,
	payload,
	created_at,
	updated_at,
	valid_from,
	valid_until
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
	)
	.bind(entry.id)
	.bind(entry.entry_type.as_str())
	.bind(entry.scope_type.as_str())
	.bind(entry.scope_id.as_deref())
	.bind(entry.name.as_str())
	.bind(entry.content.as_str())
	.bind(entry.category.as_deref())
	.bind(entry.priority)
	.bind(entry.level.as_deref())
	.bind(entry.payload.to_value())
	.bind(entry.created_at)
	.bind(entry.updated_at)
	.bind(entry.valid_from)
	.bind(entry.valid_until)
	.execute(pool)
	.await?;

	for tag in tags {
		sqlx::query("INSERT INTO entry_tags (entry_id, tag) VALUES ($1, $2)")
			.bind(entry.id)
			.bind(*tag)
			.execute(pool)
			.await?;
	}

	Ok(())
}

pub async fn insert_relation(
	pool: &PgPool,
	source: (EntryType, Uuid),
	target: (EntryType, Uuid),
	relation_type: &str,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO entry_relations (source_type, source_id, target_type, target_id, relation_type)
VALUES ($1, $2, $3, $4, $5)",
	)
	.bind(source.0.as_str())
	.bind(source.1)
	.bind(target.0.as_str())
	.bind(target.1)
	.bind(relation_type)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn insert_embedding_marker(
	pool: &PgPool,
	entry_id: Uuid,
	embedding_dim: i32,
) -> Result<()> {
	sqlx::query(
		"INSERT INTO entry_embeddings (entry_id, embedding_dim, model) VALUES ($1, $2, 'test')",
	)
	.bind(entry_id)
	.bind(embedding_dim)
	.execute(pool)
	.await?;

	Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_summary(
	pool: &PgPool,
	summary_id: Uuid,
	scope: (ScopeType, Option<&str>),
	hierarchy_level: i32,
	parent_summary_id: Option<Uuid>,
	embedding: &[f32],
	access_count: i64,
	last_accessed_at: Option<OffsetDateTime>,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO summaries (
	summary_id,
	scope_type,
	scope_id,
	hierarchy_level,
	parent_summary_id,
	title,
	embedding,
	access_count,
	last_accessed_at
)
VALUES ($1, $2, $3, $4, $5, '', $6, $7, $8)",
	)
	.bind(summary_id)
	.bind(scope.0.as_str())
	.bind(scope.1)
	.bind(hierarchy_level)
	.bind(parent_summary_id)
	.bind(embedding)
	.bind(access_count)
	.bind(last_accessed_at)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn insert_summary_member(
	pool: &PgPool,
	summary_id: Uuid,
	member_type: MemberType,
	member_id: Uuid,
	contribution_score: f32,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO summary_members (summary_id, member_type, member_id, contribution_score)
VALUES ($1, $2, $3, $4)",
	)
	.bind(summary_id)
	.bind(member_type.as_str())
	.bind(member_id)
	.bind(contribution_score)
	.execute(pool)
	.await?;

	Ok(())
}
