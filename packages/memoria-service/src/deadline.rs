use std::{
	future::Future,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	time::Duration,
};

use tokio::time::{self, Instant};

use crate::{Error, Result};

/// Per-request budget plus a cooperative cancel flag.
///
/// Clones share the cancel flag, so a caller holding one clone can stop the pipeline running with
/// another.
#[derive(Clone, Debug)]
pub struct Deadline {
	expires_at: Instant,
	cancelled: Arc<AtomicBool>,
}
impl Deadline {
	pub fn after(budget: Duration) -> Self {
		Self { expires_at: Instant::now() + budget, cancelled: Arc::new(AtomicBool::new(false)) }
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Acquire)
	}

	pub fn remaining(&self) -> Duration {
		self.expires_at.saturating_duration_since(Instant::now())
	}

	/// Fails when the request was cancelled or its budget is spent.
	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() {
			return Err(Error::Cancelled);
		}
		if self.remaining().is_zero() {
			return Err(Error::DeadlineExceeded);
		}

		Ok(())
	}

	/// Runs one collaborator call under `min(per_call, remaining)`.
	///
	/// A spent budget surfaces as `DeadlineExceeded`; a call that merely outlives its own
	/// allowance surfaces as `Timeout` so the calling stage can degrade.
	pub async fn call<F, T>(&self, operation: &'static str, per_call: Duration, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		self.check()?;

		let remaining = self.remaining();
		let budget = per_call.min(remaining);

		match time::timeout(budget, fut).await {
			Ok(result) => result,
			Err(_) if budget == remaining => Err(Error::DeadlineExceeded),
			Err(_) => {
				tracing::warn!(operation, budget_ms = budget.as_millis() as u64, "Collaborator call timed out.");

				Err(Error::Timeout { operation })
			},
		}
	}
}
