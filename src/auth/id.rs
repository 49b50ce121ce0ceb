//! Account name carried by session identities.

// std
use std::ops::Deref;
// self
use crate::_prelude::*;

/// Error returned when the login endpoint hands back an unusable account name.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SubjectError {
	/// The account name was empty.
	#[error("Account name cannot be empty.")]
	Empty,
}

/// Account name the session is authenticated as.
///
/// The server owns the naming rules; any non-empty string it returns is accepted verbatim,
/// spaces and non-ASCII characters included.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);
impl Subject {
	/// Wraps `value`, rejecting only the empty string.
	pub fn new(value: impl Into<String>) -> Result<Self, SubjectError> {
		Self::try_from(value.into())
	}
}
impl Deref for Subject {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for Subject {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<Subject> for String {
	fn from(value: Subject) -> Self {
		value.0
	}
}
impl TryFrom<String> for Subject {
	type Error = SubjectError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		if value.is_empty() {
			return Err(SubjectError::Empty);
		}

		Ok(Self(value))
	}
}
impl Debug for Subject {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Subject({})", self.0)
	}
}
impl Display for Subject {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
