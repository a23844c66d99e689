// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Activity counters kept by every [`TokenCache`](super::TokenCache), independent of the
/// `metrics` feature.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	exchanges: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Calls answered with the cached token.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Refreshes started; coalesced waiters do not add to this.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Refreshes that ended in an [`AuthError`](crate::error::AuthError).
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		bump(&self.hits);
	}

	pub(crate) fn record_exchange(&self) {
		bump(&self.exchanges);
	}

	pub(crate) fn record_failure(&self) {
		bump(&self.failures);
	}
}

fn bump(counter: &AtomicU64) {
	counter.fetch_add(1, Ordering::Relaxed);
}
