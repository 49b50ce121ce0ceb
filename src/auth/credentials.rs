//! Access/refresh credential pairing.

// self
use crate::{_prelude::*, auth::CredentialSecret};

/// Short-lived access credential plus the optional long-lived refresh credential.
///
/// Access expiry is discovered reactively (the server answers 401); the hint is only
/// informational and never drives renewal.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
	/// Access credential attached to every request.
	pub access: CredentialSecret,
	/// Optional expiry hint for the access credential.
	pub access_expiry_hint: Option<OffsetDateTime>,
	/// Refresh credential; absent when the login did not ask to be remembered.
	pub refresh: Option<CredentialSecret>,
}
impl CredentialPair {
	/// Pairs an access credential with an optional refresh credential.
	pub fn new(access: CredentialSecret, refresh: Option<CredentialSecret>) -> Self {
		Self { access, access_expiry_hint: None, refresh }
	}

	/// Attaches an informational expiry hint to the access credential.
	pub fn with_access_expiry_hint(mut self, hint: OffsetDateTime) -> Self {
		self.access_expiry_hint = Some(hint);

		self
	}

	/// Returns `true` when a refresh credential is available for renewal.
	pub fn can_renew(&self) -> bool {
		self.refresh.is_some()
	}
}
impl Debug for CredentialPair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialPair")
			.field("access", &self.access.fingerprint())
			.field("access_expiry_hint", &self.access_expiry_hint)
			.field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}
