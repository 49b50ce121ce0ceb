//! Session lifecycle: login, logout, forced logout, and password change.
//!
//! Every transition is applied to the [`SessionStore`](crate::store::SessionStore) first and
//! only then published to the [`SessionListener`](crate::signal::SessionListener), so a
//! listener reading the store always sees the state it was told about.

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, CredentialSecret, Identity, Subject},
	error::ConfigError,
	flows::{Broker, common},
	http::{ApiHttpClient, ApiRequest, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	signal::{LogoutReason, SessionSignal},
	store::Session,
};

/// Username/password login payload.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
	/// Account name.
	pub username: String,
	/// Account password.
	pub password: String,
	/// Asks the server for a refresh credential so the session survives restarts.
	pub remember_me: bool,
}
impl LoginRequest {
	/// Creates a login payload with `remember_me` enabled.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: password.into(), remember_me: true }
	}

	/// Overrides the remember-me flag.
	pub fn with_remember_me(mut self, remember_me: bool) -> Self {
		self.remember_me = remember_me;

		self
	}
}
impl Debug for LoginRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("LoginRequest")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("remember_me", &self.remember_me)
			.finish()
	}
}

/// Password change payload.
///
/// The server insists on `old_password` unless the account is in forced-reauthentication mode.
#[derive(Clone, Serialize)]
pub struct PasswordChange {
	/// Current password.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub old_password: Option<String>,
	/// Replacement password.
	pub new_password: String,
}
impl PasswordChange {
	/// Change that proves knowledge of the current password.
	pub fn new(old_password: impl Into<String>, new_password: impl Into<String>) -> Self {
		Self { old_password: Some(old_password.into()), new_password: new_password.into() }
	}

	/// Change issued while the account must reauthenticate.
	pub fn forced(new_password: impl Into<String>) -> Self {
		Self { old_password: None, new_password: new_password.into() }
	}
}
impl Debug for PasswordChange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordChange")
			.field("old_password", &self.old_password.as_ref().map(|_| "<redacted>"))
			.field("new_password", &"<redacted>")
			.finish()
	}
}

#[derive(Deserialize)]
struct LoginResponse {
	access_token: CredentialSecret,
	#[serde(default)]
	refresh_token: Option<CredentialSecret>,
	username: String,
	#[serde(default)]
	is_admin: bool,
	#[serde(default)]
	must_change_password: bool,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Logs in and replaces the current session with the issued credentials.
	///
	/// Wrong credentials come back as [`Error::AuthExpired`] carrying the server's message;
	/// the login endpoint never triggers a renewal.
	pub async fn login(&self, credentials: LoginRequest) -> Result<Session> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request =
					ApiRequest::post(self.descriptor.endpoints.login.as_str()).json(&credentials)?;
				let response = common::execute(self, &request, None).await?;
				let response = common::expect_success(response)?;
				let body: LoginResponse = response.json(&request.path)?;
				let subject = Subject::new(body.username).map_err(ConfigError::from)?;
				let identity = Identity::new(subject).with_privileged(body.is_admin);
				let refresh = body.refresh_token.filter(|secret| !secret.expose().is_empty());

				self.store.login(
					CredentialPair::new(body.access_token, refresh),
					identity,
					body.must_change_password,
				);

				let session = self.store.get();

				self.listener.on_signal(SessionSignal::from_session(&session));

				Ok(session)
			})
			.await;

		obs::record_result(KIND, result)
	}

	/// Clears the session and notifies the listener with `reason`.
	///
	/// Idempotent: returns `false` and publishes nothing when already logged out.
	pub fn force_logout(&self, reason: LogoutReason) -> bool {
		let _span = FlowSpan::new(FlowKind::Logout, reason.as_str()).entered();

		if !self.store.logout() {
			return false;
		}

		obs::session_cleared(reason);
		obs::record_flow_outcome(FlowKind::Logout, FlowOutcome::Success);
		self.listener.on_signal(SessionSignal::Unauthenticated { reason: Some(reason) });

		true
	}

	/// User-initiated logout.
	pub fn logout(&self) -> bool {
		self.force_logout(LogoutReason::UserRequested)
	}

	/// Changes the account password through the dispatcher, so an expired access credential
	/// is renewed transparently.
	///
	/// On success the forced-reauthentication flag is cleared and
	/// [`SessionSignal::Authenticated`] is published. The credential pair is left untouched.
	pub async fn change_password(&self, change: PasswordChange) -> Result<()> {
		const KIND: FlowKind = FlowKind::PasswordChange;

		let span = FlowSpan::new(KIND, "change_password");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let request =
					ApiRequest::put(self.descriptor.endpoints.update_password.as_str())
						.json(&change)?;

				self.send(request).await?;
				self.store.clear_must_reauthenticate();

				let session = self.store.get();

				if session.is_live() {
					self.listener.on_signal(SessionSignal::from_session(&session));
				}

				Ok(())
			})
			.await;

		obs::record_result(KIND, result)
	}

	/// Signal matching the current session.
	pub fn signal(&self) -> SessionSignal {
		SessionSignal::from_session(&self.store.get())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn payload_debug_output_redacts_passwords() {
		let login = format!("{:?}", LoginRequest::new("alice", "hunter2"));
		let change = format!("{:?}", PasswordChange::new("hunter2", "correct horse"));

		assert!(login.contains("alice"));
		assert!(!login.contains("hunter2"));
		assert!(!change.contains("hunter2"));
		assert!(!change.contains("correct horse"));
	}

	#[test]
	fn payloads_match_wire_shape() {
		let login = serde_json::to_value(LoginRequest::new("alice", "pw").with_remember_me(false))
			.expect("Login payload should serialize.");
		let forced = serde_json::to_value(PasswordChange::forced("new"))
			.expect("Password change should serialize.");

		assert_eq!(
			login,
			serde_json::json!({ "username": "alice", "password": "pw", "remember_me": false })
		);
		assert_eq!(forced, serde_json::json!({ "new_password": "new" }));
	}
}
