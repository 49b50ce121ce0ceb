// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for renewal cycles.
#[derive(Debug, Default)]
pub struct RenewalMetrics {
	renewals: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	abandoned: AtomicU64,
	waiters: AtomicU64,
	stale_hits: AtomicU64,
}
impl RenewalMetrics {
	/// Returns the number of renewal calls started (one per cycle).
	pub fn renewals(&self) -> u64 {
		self.renewals.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that settled with a new credential.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles that settled with a terminal failure.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Returns the number of cycles whose driver went away before settling.
	pub fn abandoned(&self) -> u64 {
		self.abandoned.load(Ordering::Relaxed)
	}

	/// Returns the number of callers queued behind an in-flight renewal.
	pub fn waiters(&self) -> u64 {
		self.waiters.load(Ordering::Relaxed)
	}

	/// Returns how often an auth-expired report was answered with an already-renewed
	/// credential instead of starting a new cycle.
	pub fn stale_hits(&self) -> u64 {
		self.stale_hits.load(Ordering::Relaxed)
	}

	pub(crate) fn record_renewal(&self) {
		self.renewals.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_abandoned(&self) {
		self.abandoned.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_waiter(&self) {
		self.waiters.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_stale_hit(&self) {
		self.stale_hits.fetch_add(1, Ordering::Relaxed);
	}
}
