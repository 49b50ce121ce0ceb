//! Transport primitives for API calls.
//!
//! The module exposes [`ApiHttpClient`], the broker's only dependency on an HTTP stack, plus
//! the request/response types the dispatcher works with ([`ApiRequest`], [`ApiResponse`])
//! and the [`TransportErrorMapper`] that turns transport failures into broker errors.
//! Implementations receive fully built [`HttpRequest`] values (URL resolved, bearer header
//! attached) together with the timeout to enforce, and hand back the raw [`HttpResponse`];
//! status classification happens in the broker so every transport behaves the same.

mod mapper;
mod request;

pub use mapper::*;
pub use request::*;

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

/// Outbound request shape handed to transports.
pub type HttpRequest = http::Request<Vec<u8>>;
/// Inbound response shape returned by transports.
pub type HttpResponse = http::Response<Vec<u8>>;
/// Boxed future returned by [`ApiHttpClient::execute`].
pub type HttpFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing API calls.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// every in-flight request, and their futures must be `Send` so broker futures can hop
/// executors. Any HTTP status (including 401 and 5xx) is a successful transport outcome;
/// only failures to obtain a response belong in [`ApiHttpClient::TransportError`].
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Executes `request`, aborting once `timeout` elapses when one is provided.
	fn execute(
		&self,
		request: HttpRequest,
		timeout: Option<Duration>,
	) -> HttpFuture<'_, Self::TransportError>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	type TransportError = ReqwestError;

	fn execute(
		&self,
		request: HttpRequest,
		timeout: Option<Duration>,
	) -> HttpFuture<'_, Self::TransportError> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut request = reqwest::Request::try_from(request)?;

			if let Some(timeout) = timeout {
				*request.timeout_mut() = Some(timeout.unsigned_abs());
			}

			let response = client.execute(request).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
