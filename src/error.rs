//! Broker-level error types shared across the dispatcher, coordinator, lifecycle, and stores.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Non-auth error response returned verbatim by the server.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Server rejected the request as unauthenticated and no renewal applies.
	///
	/// Raised for 401 responses on requests that were already replayed once, on requests
	/// issued without a refresh credential, and on the login/renewal endpoints themselves.
	#[error("Request was rejected as unauthenticated: {message}.")]
	AuthExpired {
		/// Server-supplied message, or a generic description for opaque bodies.
		message: String,
	},
	/// Credential renewal failed terminally and the session was logged out.
	#[error(transparent)]
	SessionTerminated(#[from] TerminalAuthError),
}
impl Error {
	/// Returns `true` when the error means the caller must log in again.
	pub fn requires_login(&self) -> bool {
		matches!(self, Self::SessionTerminated(_) | Self::AuthExpired { .. })
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] http::Error),
	/// API descriptor failed validation.
	#[error(transparent)]
	InvalidDescriptor(#[from] crate::api::ApiDescriptorError),
	/// A request path could not be resolved against the API base URL.
	#[error("Request path `{path}` cannot be resolved against the API base URL.")]
	InvalidPath {
		/// Offending relative path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header value supplied by the caller or derived from a credential is invalid.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: String,
		/// Underlying validation failure.
		#[source]
		source: http::header::InvalidHeaderValue,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
	/// Response body could not be decoded into the expected shape.
	#[error("Response from `{endpoint}` could not be decoded.")]
	ResponseParse {
		/// Endpoint path that produced the body.
		endpoint: String,
		/// HTTP status code of the response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Login response carried an identity that fails validation.
	#[error("Login response carried an invalid identity.")]
	InvalidIdentity(#[from] crate::auth::SubjectError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{endpoint}`.")]
	Network {
		/// Endpoint path being called.
		endpoint: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded its configured timeout.
	#[error("Request to `{endpoint}` timed out.")]
	Timeout {
		/// Endpoint path being called.
		endpoint: String,
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint: endpoint.into(), source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(
		endpoint: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Timeout { endpoint: endpoint.into(), source: Box::new(src) }
	}

	/// Returns `true` for timeout failures.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}

/// Non-auth error response (4xx other than 401, or 5xx) passed through to the caller.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error(
	"API request failed with HTTP {status}: {}.",
	.message.as_deref().unwrap_or("opaque error body")
)]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Message from an `{"error": "..."}` body, when the body has that shape.
	pub message: Option<String>,
	/// Raw response body.
	pub body: Vec<u8>,
}

/// Reason attached to a terminal renewal failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
	/// Renewal endpoint rejected the refresh credential.
	RefreshRejected,
	/// No refresh credential was available when renewal was required.
	MissingRefreshCredential,
	/// Renewal call exceeded the fixed renewal timeout.
	Timeout,
	/// Renewal call failed at the transport layer or with a non-auth error status.
	Transport,
	/// Renewal endpoint answered 2xx with a body that could not be decoded.
	InvalidResponse,
	/// The session was logged out while the renewal was in flight.
	SessionEnded,
}
impl TerminalReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::RefreshRejected => "refresh_rejected",
			Self::MissingRefreshCredential => "missing_refresh_credential",
			Self::Timeout => "timeout",
			Self::Transport => "transport",
			Self::InvalidResponse => "invalid_response",
			Self::SessionEnded => "session_ended",
		}
	}
}
impl Display for TerminalReason {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Terminal auth failure shared by the renewal driver and every queued waiter.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Session terminated ({reason}): {message}.")]
pub struct TerminalAuthError {
	/// Classified failure reason.
	pub reason: TerminalReason,
	/// Human-readable description of the failure.
	pub message: String,
}
impl TerminalAuthError {
	/// Creates a terminal error with the provided reason and message.
	pub fn new(reason: TerminalReason, message: impl Into<String>) -> Self {
		Self { reason, message: message.into() }
	}

	/// Classifies a renewal-call failure into a terminal error.
	pub fn from_renewal_error(err: &Error) -> Self {
		let reason = match err {
			Error::AuthExpired { .. } => TerminalReason::RefreshRejected,
			Error::Transport(e) if e.is_timeout() => TerminalReason::Timeout,
			Error::Config(ConfigError::ResponseParse { .. }) => TerminalReason::InvalidResponse,
			Error::SessionTerminated(e) => e.reason,
			_ => TerminalReason::Transport,
		};

		Self::new(reason, err.to_string())
	}
}
