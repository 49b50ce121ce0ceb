// self
use crate::{
	_prelude::*,
	api::{ApiDescriptor, ApiEndpoints},
};

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ApiDescriptorError {
	/// Base URL must use HTTPS unless it points at a loopback host.
	#[error("The base URL must use HTTPS: {url}.")]
	InsecureBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Base URL cannot carry relative paths (e.g. `mailto:` or `data:` URLs).
	#[error("The base URL cannot be used as a base: {url}.")]
	NotABase {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoint paths must be non-empty and relative to the base URL.
	#[error("The {endpoint} endpoint path must be a non-empty relative path: `{path}`.")]
	InvalidEndpointPath {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending path.
		path: String,
	},
	/// Timeouts must be strictly positive.
	#[error("The {timeout} timeout must be positive.")]
	NonPositiveTimeout {
		/// Which timeout failed validation.
		timeout: &'static str,
	},
}

/// Builder for [`ApiDescriptor`] values.
#[derive(Debug)]
pub struct ApiDescriptorBuilder {
	/// Base URL all request paths resolve against.
	pub base_url: Url,
	/// Auth endpoint paths.
	pub endpoints: ApiEndpoints,
	/// Timeout applied to the renewal call.
	pub renewal_timeout: Duration,
	/// Default timeout for other requests.
	pub request_timeout: Option<Duration>,
}
impl ApiDescriptorBuilder {
	/// Creates a new builder seeded with the provided base URL and default endpoints.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			endpoints: ApiEndpoints::default(),
			renewal_timeout: ApiDescriptor::DEFAULT_RENEWAL_TIMEOUT,
			request_timeout: Some(ApiDescriptor::DEFAULT_REQUEST_TIMEOUT),
		}
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.login = path.into();

		self
	}

	/// Overrides the renewal endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.refresh = path.into();

		self
	}

	/// Overrides the password-change endpoint path.
	pub fn update_password_path(mut self, path: impl Into<String>) -> Self {
		self.endpoints.update_password = path.into();

		self
	}

	/// Overrides the fixed renewal timeout (defaults to 15 seconds).
	pub fn renewal_timeout(mut self, timeout: Duration) -> Self {
		self.renewal_timeout = timeout;

		self
	}

	/// Overrides the default request timeout; `None` disables it.
	pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ApiDescriptor, ApiDescriptorError> {
		let mut base_url = self.base_url;

		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		let descriptor = ApiDescriptor {
			base_url,
			endpoints: self.endpoints,
			renewal_timeout: self.renewal_timeout,
			request_timeout: self.request_timeout,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ApiDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ApiDescriptorError> {
		validate_base_url(&self.base_url)?;
		validate_endpoint_path("login", &self.endpoints.login)?;
		validate_endpoint_path("refresh", &self.endpoints.refresh)?;
		validate_endpoint_path("update_password", &self.endpoints.update_password)?;

		if !self.renewal_timeout.is_positive() {
			return Err(ApiDescriptorError::NonPositiveTimeout { timeout: "renewal" });
		}
		if self.request_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(ApiDescriptorError::NonPositiveTimeout { timeout: "request" });
		}

		Ok(())
	}
}

fn validate_base_url(url: &Url) -> Result<(), ApiDescriptorError> {
	if url.cannot_be_a_base() {
		return Err(ApiDescriptorError::NotABase { url: url.to_string() });
	}

	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(ApiDescriptorError::InsecureBaseUrl { url: url.to_string() }),
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
		Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
		None => false,
	}
}

fn validate_endpoint_path(endpoint: &'static str, path: &str) -> Result<(), ApiDescriptorError> {
	let trimmed = path.trim_start_matches('/');

	if trimmed.is_empty() || trimmed.contains("://") || path.starts_with("//") {
		Err(ApiDescriptorError::InvalidEndpointPath { endpoint, path: path.to_owned() })
	} else {
		Ok(())
	}
}
