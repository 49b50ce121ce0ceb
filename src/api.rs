//! API descriptor: where the server lives, which paths are the auth endpoints, and the
//! timeouts the broker applies.
//!
//! Descriptors are immutable once built. Use [`ApiDescriptor::builder`] to assemble one; the
//! builder validates the base URL (HTTPS, or plain HTTP on a loopback host), endpoint paths,
//! and timeouts before handing out a descriptor.

/// Builder API for assembling API descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Paths (relative to the base URL) of the endpoints the session core talks to directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEndpoints {
	/// `POST {username, password, remember_me}` login endpoint.
	pub login: String,
	/// `POST {refresh_token}` renewal endpoint.
	pub refresh: String,
	/// `PUT {old_password?, new_password}` password-change endpoint.
	pub update_password: String,
}
impl Default for ApiEndpoints {
	fn default() -> Self {
		Self {
			login: "auth/login".into(),
			refresh: "auth/refresh".into(),
			update_password: "auth/update_password".into(),
		}
	}
}

/// Classification of a request path against the descriptor's auth endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndpointKind {
	/// Login endpoint; a 401 here is a bad-credentials answer, never a renewal trigger.
	Login,
	/// Renewal endpoint; a 401 here is terminal.
	Refresh,
	/// Password-change endpoint; authenticated like any domain endpoint.
	UpdatePassword,
	/// Any other endpoint.
	Domain,
}
impl EndpointKind {
	/// Whether a 401 on this endpoint may be recovered through renewal.
	pub const fn allows_renewal(self) -> bool {
		matches!(self, Self::UpdatePassword | Self::Domain)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Login => "login",
			Self::Refresh => "refresh",
			Self::UpdatePassword => "update_password",
			Self::Domain => "domain",
		}
	}
}

/// Immutable API descriptor consumed by the broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDescriptor {
	/// Base URL every relative request path is resolved against; always ends with `/`.
	pub base_url: Url,
	/// Auth endpoint paths.
	pub endpoints: ApiEndpoints,
	/// Fixed timeout applied to the renewal call; expiry counts as a terminal failure.
	pub renewal_timeout: Duration,
	/// Default timeout for every other request, if any.
	pub request_timeout: Option<Duration>,
}
impl ApiDescriptor {
	/// Default renewal timeout.
	pub const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::seconds(15);
	/// Default request timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(15);

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ApiDescriptorBuilder {
		ApiDescriptorBuilder::new(base_url)
	}

	/// Resolves a request path against the base URL.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.to_owned(), source })
	}

	/// Classifies a request path.
	pub fn classify(&self, path: &str) -> EndpointKind {
		let path = normalize_path(path);

		if path == normalize_path(&self.endpoints.login) {
			EndpointKind::Login
		} else if path == normalize_path(&self.endpoints.refresh) {
			EndpointKind::Refresh
		} else if path == normalize_path(&self.endpoints.update_password) {
			EndpointKind::UpdatePassword
		} else {
			EndpointKind::Domain
		}
	}
}

fn normalize_path(path: &str) -> &str {
	let path = path.trim_start_matches('/');

	path.split(['?', '#']).next().unwrap_or(path)
}
