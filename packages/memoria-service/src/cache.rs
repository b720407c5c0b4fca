//! Read-through cache of assembled responses, keyed by the normalized request digest.

use std::{sync::Arc, time::Duration};

use moka::sync::Cache;

use crate::result::QueryResponse;

pub trait ResultCache
where
	Self: Send + Sync,
{
	fn get(&self, key: &str) -> Option<Arc<QueryResponse>>;

	fn put(&self, key: String, response: Arc<QueryResponse>);
}

/// TTL- and capacity-bounded response cache.
pub struct InMemoryResultCache {
	inner: Cache<String, Arc<QueryResponse>>,
}
impl InMemoryResultCache {
	pub fn new(ttl: Duration, max_entries: usize) -> Self {
		let inner =
			Cache::builder().max_capacity(max_entries.max(1) as u64).time_to_live(ttl).build();

		Self { inner }
	}

	pub fn from_config(cfg: &memoria_config::Cache) -> Self {
		Self::new(Duration::from_secs(cfg.ttl_secs), cfg.max_entries as usize)
	}

	/// Entry count after pending evictions are applied.
	pub fn len(&self) -> usize {
		self.inner.run_pending_tasks();

		self.inner.entry_count() as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl ResultCache for InMemoryResultCache {
	fn get(&self, key: &str) -> Option<Arc<QueryResponse>> {
		self.inner.get(key)
	}

	fn put(&self, key: String, response: Arc<QueryResponse>) {
		self.inner.insert(key, response);
	}
}
