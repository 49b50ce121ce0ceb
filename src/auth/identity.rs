//! Non-secret identity metadata that travels with a session.

// self
use crate::{_prelude::*, auth::Subject};

/// Who the session belongs to. Carries no secrets and is safe to persist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Account name returned by the login endpoint.
	pub subject: Subject,
	/// Whether the account holds administrative privileges.
	pub is_privileged: bool,
	/// Forces the UI to block all other interaction until the password is changed.
	pub must_reauthenticate: bool,
}
impl Identity {
	/// Creates an unprivileged identity without the reauthentication flag.
	pub fn new(subject: Subject) -> Self {
		Self { subject, is_privileged: false, must_reauthenticate: false }
	}

	/// Overrides the privilege flag.
	pub fn with_privileged(mut self, is_privileged: bool) -> Self {
		self.is_privileged = is_privileged;

		self
	}

	/// Overrides the forced-reauthentication flag.
	pub fn with_must_reauthenticate(mut self, must_reauthenticate: bool) -> Self {
		self.must_reauthenticate = must_reauthenticate;

		self
	}
}
