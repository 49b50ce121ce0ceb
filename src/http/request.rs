// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	auth::CredentialSecret,
	error::ConfigError,
	http::HttpRequest,
};

const JSON: &str = "application/json";

/// Short description of a request (method + path) used for logging and waiter bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestLabel {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the API base URL.
	pub path: String,
}
impl Display for RequestLabel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} {}", self.method, self.path)
	}
}

/// Outbound API call described relative to the descriptor's base URL.
///
/// The dispatcher attaches the `Authorization` header itself; callers never set it.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the API base URL.
	pub path: String,
	/// Query pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
	/// Extra request headers.
	pub headers: HeaderMap,
	/// Serialized body, if any.
	pub body: Option<Vec<u8>>,
	/// Per-request timeout overriding the descriptor default.
	pub timeout: Option<Duration>,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
			timeout: None,
		}
	}

	/// `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends a query pair.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Sets an extra header, replacing any previous value.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as the JSON request body.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		let bytes =
			serde_json::to_vec(body).map_err(|source| ConfigError::RequestBody { source })?;

		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
		self.body = Some(bytes);

		Ok(self)
	}

	/// Overrides the timeout for this request.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Method + path label.
	pub fn label(&self) -> RequestLabel {
		RequestLabel { method: self.method.clone(), path: self.path.clone() }
	}

	/// Builds the transport request, attaching `bearer` as the `Authorization` header.
	pub(crate) fn to_http(
		&self,
		descriptor: &ApiDescriptor,
		bearer: Option<&CredentialSecret>,
	) -> Result<HttpRequest, ConfigError> {
		let mut url = descriptor.resolve(&self.path)?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		let mut request = http::Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.body(self.body.clone().unwrap_or_default())?;
		let headers = request.headers_mut();

		headers.extend(self.headers.clone());
		headers.entry(ACCEPT).or_insert(HeaderValue::from_static(JSON));
		headers.remove(AUTHORIZATION);

		if let Some(secret) = bearer {
			let mut value = HeaderValue::from_str(&secret.bearer()).map_err(|source| {
				ConfigError::InvalidHeader { name: AUTHORIZATION.to_string(), source }
			})?;

			value.set_sensitive(true);
			headers.insert(AUTHORIZATION, value);
		}

		Ok(request)
	}

	/// Effective timeout: the per-request override, else the descriptor default.
	pub(crate) fn effective_timeout(&self, descriptor: &ApiDescriptor) -> Option<Duration> {
		self.timeout.or(descriptor.request_timeout)
	}
}

/// Response returned to callers of the dispatcher.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Returns `true` for 2xx responses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON, reporting the failing field path on error.
	pub fn json<T>(&self, endpoint: &str) -> Result<T, ConfigError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
			ConfigError::ResponseParse { endpoint: endpoint.to_owned(), status: self.status, source }
		})
	}
}
impl From<http::Response<Vec<u8>>> for ApiResponse {
	fn from(response: http::Response<Vec<u8>>) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status.as_u16(), headers: parts.headers, body }
	}
}
