//! Redacting credential wrapper that keeps secrets out of logs.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const FINGERPRINT_LEN: usize = 12;

/// Opaque credential (access or refresh) whose formatters never reveal the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialSecret(String);
impl CredentialSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner credential value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Short, log-safe fingerprint: the first characters of the unpadded base64url SHA-256
	/// digest of the secret.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());
		let mut encoded = URL_SAFE_NO_PAD.encode(digest);

		encoded.truncate(FINGERPRINT_LEN);

		encoded
	}

	/// Formats the credential as an `Authorization` header value.
	pub(crate) fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl AsRef<str> for CredentialSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for CredentialSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("CredentialSecret").field(&"<redacted>").finish()
	}
}
impl Display for CredentialSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
