use std::collections::{BTreeMap, BTreeSet};

use memoria_domain::EntryType;
use uuid::Uuid;

use crate::{
	QueryDeps, Result,
	collaborators::EntryQuery,
	pipeline::{
		IdSets, PipelineContext, Stage, mark_stage_completed, record_decision,
		validate_stage_prerequisites,
	},
	stages::fetch_limit,
};

/// How candidates of one type are selected.
#[derive(Debug, PartialEq)]
enum Selection {
	Ids(Vec<Uuid>),
	/// Everything visible from the scope chain, optionally topped up with related ids.
	Scopes { extra: Vec<Uuid> },
}

pub async fn run(mut ctx: PipelineContext, deps: &QueryDeps<'_>) -> Result<PipelineContext> {
	validate_stage_prerequisites(&ctx, Stage::Fetch)?;

	let limit = fetch_limit(&ctx, deps);
	let mut fetched = BTreeMap::new();
	let mut scope_scans = 0_usize;

	for &entry_type in &ctx.params.types {
		let selection = select(&ctx, entry_type);
		let mut entries = match &selection {
			Selection::Ids(ids) if ids.is_empty() => Vec::new(),
			Selection::Ids(ids) => fetch(deps, entry_type, EntryQuery::Ids(ids)).await?,
			Selection::Scopes { .. } => {
				scope_scans += 1;

				fetch(deps, entry_type, EntryQuery::Scopes { chain: &ctx.scope_chain, limit }).await?
			},
		};

		if let Selection::Scopes { extra } = &selection {
			let missing = extra
				.iter()
				.filter(|id| !entries.iter().any(|entry| entry.id == **id))
				.copied()
				.collect::<Vec<_>>();

			if !missing.is_empty() {
				entries.extend(fetch(deps, entry_type, EntryQuery::Ids(&missing)).await?);
			}
		}

		fetched.insert(entry_type, entries);
	}

	let count = fetched.values().map(Vec::len).sum::<usize>();

	tracing::debug!(count, scope_scans, "Candidates fetched.");

	ctx.fetched_entries = Some(fetched);
	ctx = record_decision(ctx, "fetchedCount", count);

	Ok(mark_stage_completed(ctx, Stage::Fetch))
}

async fn fetch(
	deps: &QueryDeps<'_>,
	entry_type: EntryType,
	query: EntryQuery<'_>,
) -> Result<Vec<memoria_domain::EntrySnapshot>> {
	deps.deadline
		.call(
			"entry fetch",
			deps.collaborator_timeout(),
			deps.collaborators.entries.fetch_entries(entry_type, query),
		)
		.await
}

/// Search-derived sets constrain the fetch to their union. Without any, a search query scans the
/// scope chain and a relation-only query fetches just the related entries.
fn select(ctx: &PipelineContext, entry_type: EntryType) -> Selection {
	let related = ids_of(ctx.related_ids.as_ref(), entry_type);
	let semantic = ctx.semantic_scores.as_ref().map(|scores| {
		scores
			.iter()
			.filter(|(_, score)| score.entry_type == entry_type)
			.map(|(id, _)| *id)
			.collect::<BTreeSet<_>>()
	});
	let lexical = ids_of(ctx.fts_match_ids.as_ref(), entry_type);

	if semantic.is_some() || lexical.is_some() {
		let mut ids = BTreeSet::new();

		for set in [semantic, lexical, related].into_iter().flatten() {
			ids.extend(set);
		}

		return Selection::Ids(ids.into_iter().collect());
	}
	if ctx.has_search() {
		return Selection::Scopes { extra: related.unwrap_or_default().into_iter().collect() };
	}

	match related {
		Some(ids) => Selection::Ids(ids.into_iter().collect()),
		None => Selection::Scopes { extra: Vec::new() },
	}
}

fn ids_of(sets: Option<&IdSets>, entry_type: EntryType) -> Option<BTreeSet<Uuid>> {
	sets.map(|sets| {
		sets.get(&entry_type).map(|ids| ids.iter().copied().collect()).unwrap_or_default()
	})
}
