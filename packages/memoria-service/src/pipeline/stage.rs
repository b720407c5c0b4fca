use std::fmt;

use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
	Resolve,
	Strategy,
	Rewrite,
	Hierarchical,
	Semantic,
	Fts,
	Relations,
	Fetch,
	EntityFilter,
	Tags,
	Filter,
	Feedback,
	Score,
	Rerank,
	CrossEncoder,
}
impl Stage {
	/// Canonical execution order.
	pub const ALL: [Self; 15] = [
		Self::Resolve,
		Self::Strategy,
		Self::Rewrite,
		Self::Hierarchical,
		Self::Semantic,
		Self::Fts,
		Self::Relations,
		Self::Fetch,
		Self::EntityFilter,
		Self::Tags,
		Self::Filter,
		Self::Feedback,
		Self::Score,
		Self::Rerank,
		Self::CrossEncoder,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Resolve => "RESOLVE",
			Self::Strategy => "STRATEGY",
			Self::Rewrite => "REWRITE",
			Self::Hierarchical => "HIERARCHICAL",
			Self::Semantic => "SEMANTIC",
			Self::Fts => "FTS",
			Self::Relations => "RELATIONS",
			Self::Fetch => "FETCH",
			Self::EntityFilter => "ENTITY_FILTER",
			Self::Tags => "TAGS",
			Self::Filter => "FILTER",
			Self::Feedback => "FEEDBACK",
			Self::Score => "SCORE",
			Self::Rerank => "RERANK",
			Self::CrossEncoder => "CROSS_ENCODER",
		}
	}

	pub fn prerequisites(self) -> &'static [Stage] {
		match self {
			Self::Resolve => &[],
			Self::Strategy | Self::Rewrite | Self::Relations | Self::Fetch => &[Self::Resolve],
			Self::Hierarchical | Self::Semantic | Self::Fts => &[Self::Strategy],
			Self::EntityFilter | Self::Tags => &[Self::Fetch],
			Self::Filter => &[Self::Fetch, Self::Tags],
			Self::Feedback | Self::Score => &[Self::Filter],
			Self::Rerank | Self::CrossEncoder => &[Self::Score],
		}
	}

	fn bit(self) -> u16 {
		1 << (self as u16)
	}
}
impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Set of completed stages. `Copy`, so adding a stage always yields a new value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StageSet(u16);
impl StageSet {
	pub fn contains(self, stage: Stage) -> bool {
		self.0 & stage.bit() != 0
	}

	#[must_use]
	pub fn with(self, stage: Stage) -> Self {
		Self(self.0 | stage.bit())
	}

	pub fn len(self) -> usize {
		self.0.count_ones() as usize
	}

	pub fn is_empty(self) -> bool {
		self.0 == 0
	}

	pub fn iter(self) -> impl Iterator<Item = Stage> {
		Stage::ALL.into_iter().filter(move |stage| self.contains(*stage))
	}
}
impl Serialize for StageSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.collect_seq(self.iter())
	}
}
