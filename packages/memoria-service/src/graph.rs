//! Breadth-first expansion over explicit entry relations.

use std::{
	collections::{HashMap, HashSet},
	time::Duration,
};

use memoria_domain::{EntryKey, RelationDirection};

use crate::{Deadline, Result, collaborators::RelationStore, pipeline::IdSets};

/// Returns every entry reachable from `seeds` within `max_depth` hops. Seeds themselves are
/// excluded and each entry is visited once, so cycles terminate.
pub async fn traverse_relation_graph(
	store: &dyn RelationStore,
	seeds: &[EntryKey],
	direction: RelationDirection,
	relation_type: Option<&str>,
	max_depth: u32,
	deadline: &Deadline,
	call_timeout: Duration,
) -> Result<IdSets> {
	let mut visited: HashMap<_, HashSet<_>> = HashMap::new();
	let mut related = IdSets::new();
	let mut frontier = Vec::new();

	for seed in seeds {
		if visited.entry(seed.entry_type).or_default().insert(seed.id) {
			frontier.push(*seed);
		}
	}

	for depth in 0..max_depth {
		if frontier.is_empty() {
			break;
		}

		let edges = deadline
			.call("relation traversal", call_timeout, store.neighbors(&frontier, direction, relation_type))
			.await?;
		let current = frontier.iter().copied().collect::<HashSet<_>>();
		let mut next = Vec::new();

		for edge in &edges {
			for from in [edge.source(), edge.target()] {
				if !current.contains(&from) {
					continue;
				}

				if let Some(to) = edge.step_from(from, direction)
					&& visited.entry(to.entry_type).or_default().insert(to.id)
				{
					related.entry(to.entry_type).or_default().insert(to.id);
					next.push(to);
				}
			}
		}

		tracing::debug!(depth = depth + 1, discovered = next.len(), "Relation frontier expanded.");

		next.sort();

		frontier = next;
	}

	Ok(related)
}
