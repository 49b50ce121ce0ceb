//! Session coordination for bearer-authenticated API clients: single-flight credential
//! renewal, replay-once dispatch, and durable refresh sessions behind one broker facade.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod error;
pub mod flows;
pub mod http;
pub mod obs;
pub mod refresh;
pub mod signal;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		api::ApiDescriptor,
		flows::Broker,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
		signal::{SessionListener, SessionSignal},
		store::SessionStore,
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Listener that records every signal it receives.
	#[derive(Clone, Debug, Default)]
	pub struct RecordingListener(Arc<Mutex<Vec<SessionSignal>>>);
	impl RecordingListener {
		/// Signals received so far, oldest first.
		pub fn signals(&self) -> Vec<SessionSignal> {
			self.0.lock().clone()
		}
	}
	impl SessionListener for RecordingListener {
		fn on_signal(&self, signal: SessionSignal) {
			self.0.lock().push(signal);
		}
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Descriptor rooted at `base_url` with default endpoints and timeouts.
	pub fn test_descriptor(base_url: &str) -> ApiDescriptor {
		ApiDescriptor::builder(Url::parse(base_url).expect("Mock base URL should parse."))
			.build()
			.expect("Test descriptor should build successfully.")
	}

	/// Constructs a [`Broker`] over `descriptor` backed by an in-memory store, the reqwest
	/// transport used across integration tests, and a [`RecordingListener`].
	pub fn build_reqwest_test_broker(
		descriptor: ApiDescriptor,
	) -> (ReqwestTestBroker, Arc<SessionStore>, RecordingListener) {
		let store = Arc::new(SessionStore::in_memory());
		let listener = RecordingListener::default();
		let broker = ReqwestTestBroker::with_http_client(
			store.clone(),
			descriptor,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_listener(listener.clone());

		(broker, store, listener)
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _};
