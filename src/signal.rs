//! Session-state signals published to the application shell.

// self
use crate::{_prelude::*, store::Session};

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
	/// The user logged out.
	UserRequested,
	/// Credential renewal failed terminally.
	RenewalFailed,
}
impl LogoutReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::UserRequested => "user_requested",
			Self::RenewalFailed => "renewal_failed",
		}
	}
}
impl Display for LogoutReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Coarse session state the UI routes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionSignal {
	/// A usable session exists.
	Authenticated,
	/// A session exists but the account must change its password first.
	MustReauthenticate,
	/// No session; the UI should show the login screen.
	Unauthenticated {
		/// Why the previous session ended, when one did.
		reason: Option<LogoutReason>,
	},
}
impl SessionSignal {
	/// Derives the signal a listener would see for `session`.
	///
	/// A restored session that carries only a refresh credential counts as authenticated: the
	/// first request renews its access credential.
	pub fn from_session(session: &Session) -> Self {
		if !session.is_live() {
			Self::Unauthenticated { reason: None }
		} else if session.must_reauthenticate() {
			Self::MustReauthenticate
		} else {
			Self::Authenticated
		}
	}
}

/// Receives session signals. Called synchronously; implementations must not block.
pub trait SessionListener
where
	Self: Send + Sync,
{
	/// Invoked after the store has already transitioned.
	fn on_signal(&self, signal: SessionSignal);
}
impl<F> SessionListener for F
where
	F: Send + Sync + Fn(SessionSignal),
{
	fn on_signal(&self, signal: SessionSignal) {
		self(signal)
	}
}

/// Listener that ignores every signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopListener;
impl SessionListener for NoopListener {
	fn on_signal(&self, _: SessionSignal) {}
}
