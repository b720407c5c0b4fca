use std::collections::HashMap;

use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use memoria_domain::{
	EntrySnapshot, EntryType, RelationDirection, RelationEdge, Scope, ScopeLevel, ScopeType,
	Summary, SummaryMember,
};

use crate::{
	Error, Result,
	db::Db,
	models::{EmbeddingCoverage, EntryRelation, EntryTag, MemoryEntry, SummaryMemberRow, SummaryRow},
};

const ENTRY_COLUMNS: &str = "\
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
	valid_until";
const SUMMARY_COLUMNS: &str = "\
summary_id,
	scope_type,
	scope_id,
	hierarchy_level,
	parent_summary_id,
	title,
	embedding,
	member_count,
	access_count,
	last_accessed_at";

/// Lexical hit returned by [`fts_search`].
#[derive(Debug, sqlx::FromRow)]
pub struct FtsHit {
	pub entry_type: String,
	pub entry_id: Uuid,
	pub rank: f32,
}

/// Resolves `scope` into the ordered chain it inherits from, nearest first.
///
/// Session scopes walk to their project, projects walk to their org, and every chain ends at
/// global. A parent that is not registered is skipped rather than treated as an error.
pub async fn resolve_scope_chain(db: &Db, scope: &Scope) -> Result<Vec<ScopeLevel>> {
	if !scope.is_valid() {
		return Err(Error::InvalidArgument(format!(
			"Scope {} requires a non-empty id unless it is global.",
			scope.scope_type
		)));
	}

	let mut chain: Vec<(ScopeType, Option<String>)> =
		vec![(scope.scope_type, scope.scope_id.clone())];

	if scope.inherit {
		let mut cursor = (scope.scope_type, scope.scope_id.clone());

		while let Some(parent) = parent_scope(&db.pool, cursor.0, cursor.1.as_deref()).await? {
			chain.push(parent.clone());

			cursor = parent;
		}

		if scope.scope_type != ScopeType::Global {
			chain.push((ScopeType::Global, None));
		}
	}

	let breadth = chain.len() as u32;

	Ok(chain
		.into_iter()
		.enumerate()
		.map(|(depth, (scope_type, scope_id))| ScopeLevel {
			scope_type,
			scope_id,
			depth: depth as u32,
			breadth,
		})
		.collect())
}

async fn parent_scope<'e, E>(
	executor: E,
	scope_type: ScopeType,
	scope_id: Option<&str>,
) -> Result<Option<(ScopeType, Option<String>)>>
where
	E: PgExecutor<'e>,
{
	let Some(scope_id) = scope_id else {
		return Ok(None);
	};
	let (sql, parent_type) = match scope_type {
		ScopeType::Session =>
			("SELECT project_id FROM sessions WHERE session_id = $1", ScopeType::Project),
		ScopeType::Project => ("SELECT org_id FROM projects WHERE project_id = $1", ScopeType::Org),
		ScopeType::Org | ScopeType::Global => return Ok(None),
	};
	let parent: Option<Option<String>> =
		sqlx::query_scalar(sql).bind(scope_id).fetch_optional(executor).await?;

	Ok(parent.flatten().map(|id| (parent_type, Some(id))))
}

fn chain_columns(chain: &[ScopeLevel]) -> (Vec<String>, Vec<Option<String>>) {
	chain.iter().map(|level| (level.scope_type.as_str().to_string(), level.scope_id.clone())).unzip()
}

pub async fn fetch_entries_by_ids(
	db: &Db,
	entry_type: EntryType,
	ids: &[Uuid],
) -> Result<Vec<EntrySnapshot>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!(
		"\
SELECT
	{ENTRY_COLUMNS}
FROM memory_entries
WHERE entry_type = $1
	AND is_active
	AND entry_id = ANY($2)
ORDER BY created_at DESC, entry_id"
	);
	let rows: Vec<MemoryEntry> = sqlx::query_as(&sql)
		.bind(entry_type.as_str())
		.bind(ids)
		.fetch_all(&db.pool)
		.await?;

	rows.into_iter().map(EntrySnapshot::try_from).collect()
}

/// Active entries of one type visible from any level of `chain`, newest first.
pub async fn fetch_entries_in_scopes(
	db: &Db,
	entry_type: EntryType,
	chain: &[ScopeLevel],
	limit: i64,
) -> Result<Vec<EntrySnapshot>> {
	let (scope_types, scope_ids) = chain_columns(chain);
	let sql = format!(
		"\
SELECT
	{ENTRY_COLUMNS}
FROM memory_entries e
WHERE e.entry_type = $1
	AND e.is_active
	AND EXISTS (
		SELECT 1
		FROM unnest($2::text[], $3::text[]) AS s(scope_type, scope_id)
		WHERE s.scope_type = e.scope_type
			AND s.scope_id IS NOT DISTINCT FROM e.scope_id
	)
ORDER BY e.created_at DESC, e.entry_id
LIMIT $4"
	);
	let rows: Vec<MemoryEntry> = sqlx::query_as(&sql)
		.bind(entry_type.as_str())
		.bind(&scope_types)
		.bind(&scope_ids)
		.bind(limit)
		.fetch_all(&db.pool)
		.await?;

	rows.into_iter().map(EntrySnapshot::try_from).collect()
}

pub async fn tags_for_entries(db: &Db, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>> {
	if ids.is_empty() {
		return Ok(HashMap::new());
	}

	let rows: Vec<EntryTag> = sqlx::query_as(
		"\
SELECT entry_id, tag
FROM entry_tags
WHERE entry_id = ANY($1)
ORDER BY entry_id, tag",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;
	let mut out: HashMap<Uuid, Vec<String>> = HashMap::new();

	for row in rows {
		out.entry(row.entry_id).or_default().push(row.tag);
	}

	Ok(out)
}

/// Full-text search over entry name and content, scored with `ts_rank`.
pub async fn fts_search(
	db: &Db,
	query: &str,
	types: &[EntryType],
	chain: &[ScopeLevel],
	limit: i64,
) -> Result<Vec<FtsHit>> {
	let type_names: Vec<&str> = types.iter().map(|entry_type| entry_type.as_str()).collect();
	let (scope_types, scope_ids) = chain_columns(chain);
	let hits: Vec<FtsHit> = sqlx::query_as(
		"\
SELECT
	e.entry_type,
	e.entry_id,
	ts_rank(e.search_tsv, q.query)::real AS rank
FROM memory_entries e
CROSS JOIN websearch_to_tsquery('simple', $1) AS q(query)
WHERE e.entry_type = ANY($2)
	AND e.is_active
	AND e.search_tsv @@ q.query
	AND EXISTS (
		SELECT 1
		FROM unnest($3::text[], $4::text[]) AS s(scope_type, scope_id)
		WHERE s.scope_type = e.scope_type
			AND s.scope_id IS NOT DISTINCT FROM e.scope_id
	)
ORDER BY rank DESC, e.entry_id
LIMIT $5",
	)
	.bind(query)
	.bind(&type_names)
	.bind(&scope_types)
	.bind(&scope_ids)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(hits)
}

pub async fn embedding_coverage(
	db: &Db,
	types: &[EntryType],
	chain: &[ScopeLevel],
) -> Result<EmbeddingCoverage> {
	let type_names: Vec<&str> = types.iter().map(|entry_type| entry_type.as_str()).collect();
	let (scope_types, scope_ids) = chain_columns(chain);
	let coverage: EmbeddingCoverage = sqlx::query_as(
		"\
SELECT
	count(*) AS total,
	count(emb.entry_id) AS with_embeddings
FROM memory_entries e
LEFT JOIN entry_embeddings emb ON emb.entry_id = e.entry_id
WHERE e.entry_type = ANY($1)
	AND e.is_active
	AND EXISTS (
		SELECT 1
		FROM unnest($2::text[], $3::text[]) AS s(scope_type, scope_id)
		WHERE s.scope_type = e.scope_type
			AND s.scope_id IS NOT DISTINCT FROM e.scope_id
	)",
	)
	.bind(&type_names)
	.bind(&scope_types)
	.bind(&scope_ids)
	.fetch_one(&db.pool)
	.await?;

	Ok(coverage)
}

/// Edges touching any entry in `frontier`, restricted to the requested direction and, when
/// given, to one relation type.
pub async fn relation_edges(
	db: &Db,
	frontier: &[(EntryType, Uuid)],
	direction: RelationDirection,
	relation_type: Option<&str>,
) -> Result<Vec<RelationEdge>> {
	if frontier.is_empty() {
		return Ok(Vec::new());
	}

	let (types, ids): (Vec<&str>, Vec<Uuid>) =
		frontier.iter().map(|(entry_type, id)| (entry_type.as_str(), *id)).unzip();
	let forward = matches!(direction, RelationDirection::Forward | RelationDirection::Both);
	let backward = matches!(direction, RelationDirection::Backward | RelationDirection::Both);
	let rows: Vec<EntryRelation> = sqlx::query_as(
		"\
WITH frontier AS (
	SELECT * FROM unnest($1::text[], $2::uuid[]) AS f(entry_type, entry_id)
)
SELECT DISTINCT
	r.source_type,
	r.source_id,
	r.target_type,
	r.target_id,
	r.relation_type
FROM entry_relations r
JOIN frontier f
	ON ($3 AND r.source_type = f.entry_type AND r.source_id = f.entry_id)
	OR ($4 AND r.target_type = f.entry_type AND r.target_id = f.entry_id)
WHERE $5::text IS NULL OR r.relation_type = $5
ORDER BY r.source_type, r.source_id, r.target_type, r.target_id, r.relation_type",
	)
	.bind(&types)
	.bind(&ids)
	.bind(forward)
	.bind(backward)
	.bind(relation_type)
	.fetch_all(&db.pool)
	.await?;

	rows.into_iter().map(RelationEdge::try_from).collect()
}

/// Summaries at the highest hierarchy level of the scope, most accessed first.
pub async fn top_level_summaries(
	db: &Db,
	scope_type: ScopeType,
	scope_id: Option<&str>,
) -> Result<Vec<Summary>> {
	let sql = format!(
		"\
SELECT
	{SUMMARY_COLUMNS}
FROM summaries s
WHERE s.scope_type = $1
	AND s.scope_id IS NOT DISTINCT FROM $2
	AND s.hierarchy_level = (
		SELECT max(hierarchy_level)
		FROM summaries
		WHERE scope_type = $1
			AND scope_id IS NOT DISTINCT FROM $2
	)
ORDER BY s.access_count DESC, s.summary_id"
	);
	let rows: Vec<SummaryRow> = sqlx::query_as(&sql)
		.bind(scope_type.as_str())
		.bind(scope_id)
		.fetch_all(&db.pool)
		.await?;

	rows.into_iter().map(Summary::try_from).collect()
}

pub async fn get_summaries(db: &Db, summary_ids: &[Uuid]) -> Result<Vec<Summary>> {
	if summary_ids.is_empty() {
		return Ok(Vec::new());
	}

	let sql = format!(
		"SELECT {SUMMARY_COLUMNS} FROM summaries WHERE summary_id = ANY($1) ORDER BY summary_id"
	);
	let rows: Vec<SummaryRow> =
		sqlx::query_as(&sql).bind(summary_ids).fetch_all(&db.pool).await?;

	rows.into_iter().map(Summary::try_from).collect()
}

pub async fn child_summaries(db: &Db, parent_id: Uuid) -> Result<Vec<Summary>> {
	let sql = format!(
		"\
SELECT
	{SUMMARY_COLUMNS}
FROM summaries
WHERE parent_summary_id = $1
ORDER BY access_count DESC, summary_id"
	);
	let rows: Vec<SummaryRow> = sqlx::query_as(&sql).bind(parent_id).fetch_all(&db.pool).await?;

	rows.into_iter().map(Summary::try_from).collect()
}

pub async fn summary_members(db: &Db, summary_ids: &[Uuid]) -> Result<Vec<SummaryMember>> {
	if summary_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows: Vec<SummaryMemberRow> = sqlx::query_as(
		"\
SELECT summary_id, member_type, member_id, contribution_score
FROM summary_members
WHERE summary_id = ANY($1)
ORDER BY summary_id, contribution_score DESC, member_id",
	)
	.bind(summary_ids)
	.fetch_all(&db.pool)
	.await?;

	rows.into_iter().map(SummaryMember::try_from).collect()
}

/// Bumps access tracking in one statement so concurrent readers serialize in Postgres.
pub async fn record_summary_access(
	db: &Db,
	summary_id: Uuid,
	now: OffsetDateTime,
) -> Result<Option<Summary>> {
	let sql = format!(
		"\
UPDATE summaries
SET
	access_count = access_count + 1,
	last_accessed_at = $2
WHERE summary_id = $1
RETURNING
	{SUMMARY_COLUMNS}"
	);
	let row: Option<SummaryRow> =
		sqlx::query_as(&sql).bind(summary_id).bind(now).fetch_optional(&db.pool).await?;

	row.map(Summary::try_from).transpose()
}
