#![cfg(feature = "reqwest")]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use http::{StatusCode, header::AUTHORIZATION};
use tokio::{sync::Notify, task::JoinHandle};
// self
use session_broker::{
	_preludet::*,
	auth::{CredentialPair, CredentialSecret, Identity, Subject},
	error::{TerminalReason, TransportError},
	flows::Broker,
	http::{
		ApiHttpClient, ApiRequest, ApiResponse, HttpFuture, HttpRequest, HttpResponse,
		TransportErrorMapper,
	},
	refresh::RenewalState,
	signal::{LogoutReason, SessionSignal},
	store::SessionStore,
};

#[derive(Debug)]
enum FakeTransportError {
	TimedOut,
}
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::TimedOut => write!(f, "Transport timed out."),
		}
	}
}
impl StdError for FakeTransportError {}

#[derive(Debug)]
enum RenewalScript {
	/// Answers with `A2` after the given delay.
	Grant(std::time::Duration),
	/// The first call never answers; later calls answer with `A2`.
	HangFirst,
	/// Answers with `A2` once the gate is opened.
	Gated(Arc<Notify>),
	/// Fails as if the transport deadline elapsed.
	TimeOut,
}

/// In-process API: requests without a bearer or carrying `Bearer A1` are rejected with 401.
#[derive(Debug)]
struct FakeApi {
	renewal: RenewalScript,
	renewal_calls: AtomicUsize,
	domain_calls: AtomicUsize,
}
impl FakeApi {
	fn new(renewal: RenewalScript) -> Self {
		Self { renewal, renewal_calls: AtomicUsize::new(0), domain_calls: AtomicUsize::new(0) }
	}

	fn respond(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}
}
impl ApiHttpClient for FakeApi {
	type TransportError = FakeTransportError;

	fn execute(
		&self,
		request: HttpRequest,
		_timeout: Option<Duration>,
	) -> HttpFuture<'_, Self::TransportError> {
		Box::pin(async move {
			if request.uri().path().ends_with("/auth/refresh") {
				let call = self.renewal_calls.fetch_add(1, Ordering::SeqCst);

				match &self.renewal {
					RenewalScript::Grant(delay) => tokio::time::sleep(*delay).await,
					RenewalScript::HangFirst if call == 0 => futures::future::pending::<()>().await,
					RenewalScript::HangFirst => {},
					RenewalScript::Gated(gate) => gate.notified().await,
					RenewalScript::TimeOut => return Err(FakeTransportError::TimedOut),
				}

				return Ok(Self::respond(StatusCode::OK, r#"{"access_token":"A2"}"#));
			}

			self.domain_calls.fetch_add(1, Ordering::SeqCst);

			let authorized = request
				.headers()
				.get(AUTHORIZATION)
				.is_some_and(|value| value.as_bytes() != b"Bearer A1");

			if authorized {
				Ok(Self::respond(StatusCode::OK, "{}"))
			} else {
				Ok(Self::respond(StatusCode::UNAUTHORIZED, r#"{"error":"token expired"}"#))
			}
		})
	}
}

#[derive(Debug, Default)]
struct FakeMapper;
impl TransportErrorMapper<FakeTransportError> for FakeMapper {
	fn map_transport_error(&self, endpoint: &str, error: FakeTransportError) -> Error {
		match error {
			FakeTransportError::TimedOut => TransportError::timeout(endpoint, error).into(),
		}
	}
}

type FakeBroker = Broker<FakeApi, FakeMapper>;

fn build_broker(
	renewal: RenewalScript,
) -> (FakeBroker, Arc<FakeApi>, Arc<SessionStore>, RecordingListener) {
	let api = Arc::new(FakeApi::new(renewal));
	let store = Arc::new(SessionStore::in_memory());
	let listener = RecordingListener::default();

	store.login(
		CredentialPair::new(CredentialSecret::new("A1"), Some(CredentialSecret::new("R1"))),
		Identity::new(Subject::new("alice").expect("Subject fixture should be valid.")),
		false,
	);

	let broker = FakeBroker::with_http_client(
		store.clone(),
		test_descriptor("https://books.example.com/api/v1/"),
		api.clone(),
		Arc::new(FakeMapper),
	)
	.with_listener(listener.clone());

	(broker, api, store, listener)
}

/// Spawns a request that hits 401 and drives the renewal, then queues a second request behind
/// it. Returns both task handles once the second one is waiting.
async fn driver_and_waiter(
	broker: &FakeBroker,
	api: &FakeApi,
) -> (JoinHandle<Result<ApiResponse>>, JoinHandle<Result<ApiResponse>>) {
	let driver = tokio::spawn({
		let broker = broker.clone();

		async move { broker.send(ApiRequest::get("categories")).await }
	});

	while api.renewal_calls.load(Ordering::SeqCst) == 0 {
		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
	}

	let waiter = tokio::spawn({
		let broker = broker.clone();

		async move { broker.send(ApiRequest::get("budgets")).await }
	});

	while broker.coordinator().queued() == 0 {
		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
	}

	(driver, waiter)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_tasks_share_one_renewal_on_a_multi_threaded_runtime() {
	const CALLERS: usize = 16;

	let (broker, api, store, _) =
		build_broker(RenewalScript::Grant(std::time::Duration::from_millis(50)));
	let handles = (0..CALLERS)
		.map(|i| {
			let broker = broker.clone();

			tokio::spawn(async move { broker.send(ApiRequest::get(format!("loans/{i}"))).await })
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let response = handle
			.await
			.expect("Task should not panic.")
			.expect("Every caller should succeed after renewal.");

		assert_eq!(response.status, 200);
	}

	assert_eq!(api.renewal_calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.renewal_metrics().renewals(), 1);
	assert_eq!(broker.coordinator().state(), RenewalState::Idle);
	assert_eq!(store.get().access.as_ref().map(CredentialSecret::expose), Some("A2"));
}

#[tokio::test]
async fn dropping_the_driver_hands_the_renewal_to_a_waiter() {
	let (broker, api, store, listener) = build_broker(RenewalScript::HangFirst);
	let (driver, waiter) = driver_and_waiter(&broker, &api).await;

	driver.abort();

	let response = waiter
		.await
		.expect("Waiter task should not panic.")
		.expect("Waiter should take over the renewal and succeed.");

	assert_eq!(response.status, 200);
	assert_eq!(api.renewal_calls.load(Ordering::SeqCst), 2);
	assert_eq!(broker.renewal_metrics().abandoned(), 1);
	assert_eq!(broker.renewal_metrics().renewals(), 2);
	assert_eq!(broker.renewal_metrics().successes(), 1);
	assert_eq!(broker.coordinator().state(), RenewalState::Idle);
	assert_eq!(store.get().access.as_ref().map(CredentialSecret::expose), Some("A2"));
	assert!(listener.signals().is_empty(), "Abandoning must not log the session out.");
}

#[tokio::test]
async fn logout_during_renewal_ends_the_cycle_without_forced_logout() {
	let gate = Arc::new(Notify::new());
	let (broker, api, store, listener) = build_broker(RenewalScript::Gated(gate.clone()));
	let (driver, waiter) = driver_and_waiter(&broker, &api).await;

	assert!(broker.logout());

	gate.notify_one();

	for task in [driver, waiter] {
		let err = task
			.await
			.expect("Task should not panic.")
			.expect_err("A logged-out session must not hand out the renewed credential.");

		assert!(matches!(
			err,
			Error::SessionTerminated(ref terminal) if terminal.reason == TerminalReason::SessionEnded
		));
	}

	assert!(!store.get().is_live());
	assert!(store.get().access.is_none());
	assert_eq!(api.renewal_calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.coordinator().state(), RenewalState::Idle);
	assert_eq!(
		listener.signals(),
		[SessionSignal::Unauthenticated { reason: Some(LogoutReason::UserRequested) }]
	);
}

#[tokio::test]
async fn login_during_renewal_resolves_waiters_with_the_new_session() {
	let gate = Arc::new(Notify::new());
	let (broker, api, store, listener) = build_broker(RenewalScript::Gated(gate.clone()));
	let (driver, waiter) = driver_and_waiter(&broker, &api).await;

	store.login(
		CredentialPair::new(CredentialSecret::new("A3"), Some(CredentialSecret::new("R3"))),
		Identity::new(Subject::new("bob").expect("Subject fixture should be valid.")),
		false,
	);
	gate.notify_one();

	for task in [driver, waiter] {
		let response = task
			.await
			.expect("Task should not panic.")
			.expect("Requests should replay with the new session's credential.");

		assert_eq!(response.status, 200);
	}

	let session = store.get();

	assert_eq!(session.access.as_ref().map(CredentialSecret::expose), Some("A3"));
	assert_eq!(session.refresh.as_ref().map(CredentialSecret::expose), Some("R3"));
	assert_eq!(api.renewal_calls.load(Ordering::SeqCst), 1);
	assert_eq!(broker.renewal_metrics().successes(), 1);
	assert!(listener.signals().is_empty(), "No forced logout may be issued.");
}

#[tokio::test]
async fn transport_timeout_on_renewal_is_terminal() {
	let (broker, api, store, listener) = build_broker(RenewalScript::TimeOut);
	let err = broker
		.send(ApiRequest::get("transactions"))
		.await
		.expect_err("A timed-out renewal must fail the request.");

	assert!(matches!(
		err,
		Error::SessionTerminated(ref terminal) if terminal.reason == TerminalReason::Timeout
	));
	assert_eq!(api.renewal_calls.load(Ordering::SeqCst), 1);
	assert_eq!(api.domain_calls.load(Ordering::SeqCst), 1);
	assert!(!store.get().is_live());
	assert_eq!(
		listener.signals(),
		[SessionSignal::Unauthenticated { reason: Some(LogoutReason::RenewalFailed) }]
	);

	let err = broker
		.send(ApiRequest::get("transactions"))
		.await
		.expect_err("A logged-out session cannot renew.");

	assert!(matches!(err, Error::AuthExpired { .. }));
	assert_eq!(api.renewal_calls.load(Ordering::SeqCst), 1);
}
