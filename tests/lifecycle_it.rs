#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use session_broker::{
	_preludet::*,
	auth::{CredentialPair, CredentialSecret, Identity, Subject},
	flows::{LoginRequest, PasswordChange},
	http::{ApiRequest, ReqwestTransportErrorMapper},
	signal::{LogoutReason, SessionSignal},
	store::{MemoryPersistence, PersistedSession, SessionPersistence, SessionStore},
};

const BASE: &str = "/api/v1/";
const LOGIN: &str = "/api/v1/auth/login";
const REFRESH: &str = "/api/v1/auth/refresh";
const UPDATE_PASSWORD: &str = "/api/v1/auth/update_password";

#[tokio::test]
async fn login_populates_store_and_publishes_signal() {
	let server = MockServer::start_async().await;
	let (broker, store, listener) = build_reqwest_test_broker(test_descriptor(&server.url(BASE)));
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN).json_body(json!({
				"username": "alice",
				"password": "hunter2",
				"remember_me": true
			}));
			then.status(200).json_body(json!({
				"access_token": "A1",
				"refresh_token": "R1",
				"username": "alice",
				"is_admin": true,
				"must_change_password": false
			}));
		})
		.await;
	let session = broker
		.login(LoginRequest::new("alice", "hunter2"))
		.await
		.expect("Login should succeed.");

	login.assert_async().await;

	assert!(session.is_authenticated());
	assert_eq!(session.access.as_ref().map(CredentialSecret::expose), Some("A1"));
	assert_eq!(session.refresh.as_ref().map(CredentialSecret::expose), Some("R1"));

	let identity = session.identity.expect("Login should record an identity.");

	assert_eq!(&*identity.subject, "alice");
	assert!(identity.is_privileged);
	assert!(!identity.must_reauthenticate);
	assert_eq!(store.get().generation, session.generation);
	assert_eq!(listener.signals(), [SessionSignal::Authenticated]);
	assert_eq!(broker.signal(), SessionSignal::Authenticated);
}

#[tokio::test]
async fn login_accepts_account_names_with_spaces() {
	let server = MockServer::start_async().await;
	let (broker, store, listener) = build_reqwest_test_broker(test_descriptor(&server.url(BASE)));

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN);
			then.status(200).json_body(json!({
				"access_token": "A1",
				"refresh_token": "R1",
				"username": "John Doe",
				"is_admin": false,
				"must_change_password": false
			}));
		})
		.await;

	let session = broker
		.login(LoginRequest::new("John Doe", "pw"))
		.await
		.expect("Server-issued account names must be accepted verbatim.");
	let identity = session.identity.expect("Login should record an identity.");

	assert_eq!(&*identity.subject, "John Doe");
	assert!(store.get().is_authenticated());
	assert_eq!(store.get().refresh.as_ref().map(CredentialSecret::expose), Some("R1"));
	assert_eq!(listener.signals(), [SessionSignal::Authenticated]);
}

#[tokio::test]
async fn login_without_remember_me_holds_no_refresh_credential() {
	let server = MockServer::start_async().await;
	let (broker, _, _) = build_reqwest_test_broker(test_descriptor(&server.url(BASE)));

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN).json_body(json!({
				"username": "bob",
				"password": "pw",
				"remember_me": false
			}));
			then.status(200).json_body(json!({
				"access_token": "A1",
				"username": "bob",
				"is_admin": false,
				"must_change_password": false
			}));
		})
		.await;

	let session = broker
		.login(LoginRequest::new("bob", "pw").with_remember_me(false))
		.await
		.expect("Login should succeed.");

	assert!(session.is_authenticated());
	assert!(session.refresh.is_none());
}

#[tokio::test]
async fn wrong_credentials_surface_server_message_without_renewal() {
	let server = MockServer::start_async().await;
	let (broker, store, listener) = build_reqwest_test_broker(test_descriptor(&server.url(BASE)));

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN);
			then.status(401).json_body(json!({ "error": "invalid username or password" }));
		})
		.await;

	let renewal = server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).json_body(json!({ "access_token": "never" }));
		})
		.await;
	let err = broker
		.login(LoginRequest::new("alice", "wrong"))
		.await
		.expect_err("Wrong credentials must fail.");

	assert!(matches!(
		err,
		Error::AuthExpired { ref message } if message == "invalid username or password"
	));

	renewal.assert_calls_async(0).await;

	assert!(!store.get().is_live());
	assert!(listener.signals().is_empty());
}

#[tokio::test]
async fn forced_password_change_clears_flag_and_keeps_credentials() {
	let server = MockServer::start_async().await;
	let (broker, store, listener) = build_reqwest_test_broker(test_descriptor(&server.url(BASE)));

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN);
			then.status(200).json_body(json!({
				"access_token": "A1",
				"refresh_token": "R1",
				"username": "admin",
				"is_admin": true,
				"must_change_password": true
			}));
		})
		.await;

	let update = server
		.mock_async(|when, then| {
			when.method(PUT)
				.path(UPDATE_PASSWORD)
				.header("authorization", "Bearer A1")
				.json_body(json!({ "new_password": "s3cure!" }));
			then.status(200).json_body(json!({ "message": "password updated" }));
		})
		.await;
	let session = broker
		.login(LoginRequest::new("admin", "admin"))
		.await
		.expect("Login should succeed.");

	assert!(session.must_reauthenticate());
	assert_eq!(broker.signal(), SessionSignal::MustReauthenticate);

	broker
		.change_password(PasswordChange::forced("s3cure!"))
		.await
		.expect("Password change should succeed.");

	update.assert_async().await;

	let after = store.get();

	assert!(!after.must_reauthenticate());
	assert_eq!(after.access, session.access);
	assert_eq!(after.refresh, session.refresh);
	assert_eq!(listener.signals(), [
		SessionSignal::MustReauthenticate,
		SessionSignal::Authenticated
	]);
}

#[tokio::test]
async fn password_change_renews_expired_credential() {
	let server = MockServer::start_async().await;
	let (broker, store, _) = build_reqwest_test_broker(test_descriptor(&server.url(BASE)));

	store.login(
		CredentialPair::new(
			CredentialSecret::new("A1"),
			Some(CredentialSecret::new("R1")),
		),
		Identity::new(Subject::new("alice").expect("Subject fixture should be valid.")),
		false,
	);

	let expired = server
		.mock_async(|when, then| {
			when.method(PUT).path(UPDATE_PASSWORD).header("authorization", "Bearer A1");
			then.status(401).json_body(json!({ "error": "token expired" }));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(PUT).path(UPDATE_PASSWORD).header("authorization", "Bearer A2");
			then.status(200).json_body(json!({ "message": "password updated" }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH);
			then.status(200).json_body(json!({ "access_token": "A2" }));
		})
		.await;
	broker
		.change_password(PasswordChange::new("old", "new"))
		.await
		.expect("Password change should succeed after renewal.");

	expired.assert_async().await;
	accepted.assert_async().await;
}

#[tokio::test]
async fn logout_is_idempotent_and_publishes_once() {
	let server = MockServer::start_async().await;
	let (broker, store, listener) = build_reqwest_test_broker(test_descriptor(&server.url(BASE)));

	server
		.mock_async(|when, then| {
			when.method(POST).path(LOGIN);
			then.status(200).json_body(json!({
				"access_token": "A1",
				"refresh_token": "R1",
				"username": "alice",
				"is_admin": false,
				"must_change_password": false
			}));
		})
		.await;
	broker.login(LoginRequest::new("alice", "pw")).await.expect("Login should succeed.");

	assert!(broker.logout());
	assert!(!broker.logout());
	assert!(!broker.force_logout(LogoutReason::RenewalFailed));
	assert!(!store.get().is_live());
	assert_eq!(broker.signal(), SessionSignal::Unauthenticated { reason: None });
	assert_eq!(listener.signals(), [
		SessionSignal::Authenticated,
		SessionSignal::Unauthenticated { reason: Some(LogoutReason::UserRequested) }
	]);
}

#[tokio::test]
async fn restored_session_renews_on_first_request() {
	let server = MockServer::start_async().await;
	let persistence = Arc::new(MemoryPersistence::default());

	persistence
		.save(&PersistedSession {
			refresh: Some(CredentialSecret::new("R1")),
			identity: Some(Identity::new(
				Subject::new("alice").expect("Subject fixture should be valid."),
			)),
		})
		.expect("Seeding persistence should succeed.");

	let store =
		Arc::new(SessionStore::restore(persistence.clone()).expect("Restore should succeed."));
	let broker = ReqwestTestBroker::with_http_client(
		store.clone(),
		test_descriptor(&server.url(BASE)),
		test_reqwest_http_client(),
		Arc::new(ReqwestTransportErrorMapper),
	);

	assert!(!store.get().is_authenticated());
	assert_eq!(broker.signal(), SessionSignal::Authenticated);

	let anonymous = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/accounts").header_missing("authorization");
			then.status(401).json_body(json!({ "error": "missing token" }));
		})
		.await;
	let authorized = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/accounts").header("authorization", "Bearer A2");
			then.status(200).json_body(json!([]));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path(REFRESH).json_body(json!({ "refresh_token": "R1" }));
			then.status(200).json_body(json!({ "access_token": "A2" }));
		})
		.await;
	broker.send(ApiRequest::get("accounts")).await.expect("Request should succeed.");

	anonymous.assert_async().await;
	authorized.assert_async().await;

	assert!(store.get().is_authenticated());
	assert_eq!(
		persistence.snapshot().and_then(|snapshot| snapshot.refresh),
		Some(CredentialSecret::new("R1"))
	);
}
