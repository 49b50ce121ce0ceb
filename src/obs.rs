//! Optional observability helpers for broker flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `session_broker.flow` with the `flow` and
//!   `stage` (call site) fields, plus debug/warn events for renewal bookkeeping.
//! - Enable `metrics` to increment the `session_broker_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Login against the login endpoint.
	Login,
	/// Authenticated request dispatch, including its single replay.
	Dispatch,
	/// Single-flight credential renewal.
	Renewal,
	/// User-initiated or forced logout.
	Logout,
	/// Password change.
	PasswordChange,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::Dispatch => "dispatch",
			FlowKind::Renewal => "renewal",
			FlowKind::Logout => "logout",
			FlowKind::PasswordChange => "password_change",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
