//! Single-flight credential renewal.
//!
//! [`RefreshCoordinator`] owns the renewal state and the queue of callers waiting on it. The
//! first caller that reports an expired credential while the coordinator is idle receives a
//! [`RenewalDriver`] and performs the renewal call; everyone arriving while that call is in
//! flight receives a [`WaitHandle`] and is settled by the driver, in arrival order, with the
//! same outcome. If the driver goes away before settling, the cycle reopens: its waiters
//! report again and one of them becomes the next driver.
//!
//! Every check-and-transition runs inside one short critical section on a
//! [`parking_lot::Mutex`]. Nothing awaits while the lock is held, so two callers can never both
//! observe [`RenewalState::Idle`] and both start a renewal, whatever the runtime.

mod metrics;

pub use metrics::RenewalMetrics;

// std
use std::mem;
// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::CredentialSecret,
	error::{TerminalAuthError, TerminalReason},
	http::RequestLabel,
	obs,
	store::SessionStore,
};

/// Result delivered to every caller of one renewal cycle.
pub type RenewalOutcome = Result<CredentialSecret, TerminalAuthError>;

/// Coordinator state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenewalState {
	/// No renewal in flight.
	#[default]
	Idle,
	/// A driver is performing the renewal call.
	Renewing,
	/// The last renewal failed and its waiters are being rejected.
	Failed,
}

/// A caller parked behind the in-flight renewal.
#[derive(Debug)]
pub struct Waiter {
	/// Request that hit the expired credential.
	pub request: RequestLabel,
	completion: oneshot::Sender<RenewalOutcome>,
}
impl Waiter {
	fn settle(self, outcome: RenewalOutcome) {
		// The caller may have gone away; its receiver being dropped is fine.
		let _ = self.completion.send(outcome);
	}
}

/// How a queued caller's wait ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Settlement {
	/// The cycle settled; every waiter of the cycle receives the same outcome.
	Settled(RenewalOutcome),
	/// The driver went away before settling. Report the expiry again through
	/// [`RefreshCoordinator::begin`].
	Reopened,
}

#[derive(Debug, Default)]
struct Cycle {
	state: RenewalState,
	waiters: Vec<Waiter>,
	failure: Option<TerminalAuthError>,
}

/// What a caller reporting an expired credential must do next.
#[derive(Debug)]
pub enum Ticket<'a> {
	/// Perform the renewal call and settle the cycle.
	Drive(RenewalDriver<'a>),
	/// Wait for the in-flight renewal.
	Wait(WaitHandle),
	/// The credential was already replaced; retry with this one.
	Fresh(CredentialSecret),
	/// Renewal is impossible or has just failed.
	Rejected(TerminalAuthError),
}

/// Single-flight renewal state machine shared by every dispatcher call of one broker.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	cycle: Mutex<Cycle>,
	metrics: RenewalMetrics,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current renewal state.
	pub fn state(&self) -> RenewalState {
		self.cycle.lock().state
	}

	/// Number of callers currently waiting.
	pub fn queued(&self) -> usize {
		self.cycle.lock().waiters.len()
	}

	/// Renewal counters.
	pub fn metrics(&self) -> &RenewalMetrics {
		&self.metrics
	}

	/// Reports that `request`, sent with the credential of `observed_generation`, was answered
	/// with auth-expired.
	///
	/// The store is read while the coordinator lock is held; the store never calls back into
	/// the coordinator.
	pub fn begin(
		&self,
		request: RequestLabel,
		observed_generation: u64,
		store: &SessionStore,
	) -> Ticket<'_> {
		let mut cycle = self.cycle.lock();

		if cycle.state == RenewalState::Failed
			&& let Some(failure) = cycle.failure.as_ref()
		{
			return Ticket::Rejected(failure.clone());
		}

		match cycle.state {
			RenewalState::Renewing => {
				let (completion, receiver) = oneshot::channel();

				obs::waiter_enqueued(&request, cycle.waiters.len());
				cycle.waiters.push(Waiter { request, completion });
				self.metrics.record_waiter();

				Ticket::Wait(WaitHandle { receiver })
			},
			RenewalState::Idle | RenewalState::Failed => {
				let session = store.get();

				if session.generation != observed_generation
					&& let Some(access) = session.access.as_ref()
				{
					obs::stale_credential(&request, observed_generation, session.generation);
					self.metrics.record_stale_hit();

					return Ticket::Fresh(access.clone());
				}

				let live = session.is_live();
				let Some(refresh) = session.refresh else {
					let error = if live {
						TerminalAuthError::new(
							TerminalReason::MissingRefreshCredential,
							"No refresh credential is available for renewal",
						)
					} else {
						TerminalAuthError::new(
							TerminalReason::SessionEnded,
							"The session was logged out",
						)
					};

					return Ticket::Rejected(error);
				};

				cycle.state = RenewalState::Renewing;
				self.metrics.record_renewal();

				Ticket::Drive(RenewalDriver { coordinator: self, refresh, settled: false })
			},
		}
	}

	fn drain(&self, next: RenewalState, failure: Option<TerminalAuthError>) -> Vec<Waiter> {
		let mut cycle = self.cycle.lock();

		cycle.state = next;
		cycle.failure = failure;

		mem::take(&mut cycle.waiters)
	}
}

/// Receiver side of a queued [`Waiter`].
#[derive(Debug)]
pub struct WaitHandle {
	receiver: oneshot::Receiver<RenewalOutcome>,
}
impl WaitHandle {
	/// Waits for the in-flight renewal to settle or reopen.
	pub async fn wait(self) -> Settlement {
		self.receiver.await.map_or(Settlement::Reopened, Settlement::Settled)
	}
}

/// Exclusive right (and duty) to perform the renewal call for one cycle.
///
/// Dropping an unsettled driver returns the coordinator to [`RenewalState::Idle`] and hands
/// every waiter [`Settlement::Reopened`]. The session is left as it was.
#[derive(Debug)]
pub struct RenewalDriver<'a> {
	coordinator: &'a RefreshCoordinator,
	refresh: CredentialSecret,
	settled: bool,
}
impl RenewalDriver<'_> {
	/// Refresh credential captured when the cycle started.
	pub fn refresh_credential(&self) -> &CredentialSecret {
		&self.refresh
	}

	/// Resolves every waiter with `access`, in arrival order, and returns how many there were.
	///
	/// The caller must already have written `access` to the store.
	pub fn succeed(mut self, access: &CredentialSecret) -> usize {
		self.settled = true;

		let waiters = self.coordinator.drain(RenewalState::Idle, None);
		let count = waiters.len();

		self.coordinator.metrics.record_success();
		obs::renewal_succeeded(&access.fingerprint(), count);

		for waiter in waiters {
			waiter.settle(Ok(access.clone()));
		}

		count
	}

	/// Fails the cycle: enters [`RenewalState::Failed`], runs `on_failed` once, rejects every
	/// waiter with `error`, then returns to [`RenewalState::Idle`].
	///
	/// Callers reporting auth-expired while `on_failed` runs are rejected immediately with the
	/// same error.
	pub fn fail(mut self, error: &TerminalAuthError, on_failed: impl FnOnce()) -> usize {
		self.settled = true;

		let waiters = self.coordinator.drain(RenewalState::Failed, Some(error.clone()));
		let count = waiters.len();

		self.coordinator.metrics.record_failure();
		on_failed();
		obs::renewal_failed(error.reason, count);

		for waiter in waiters {
			waiter.settle(Err(error.clone()));
		}

		self.coordinator.drain(RenewalState::Idle, None);

		count
	}
}
impl Drop for RenewalDriver<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		// Dropping the senders wakes every waiter with `Settlement::Reopened`.
		let waiters = self.coordinator.drain(RenewalState::Idle, None);

		self.coordinator.metrics.record_abandoned();
		obs::renewal_reopened(waiters.len());
	}
}
