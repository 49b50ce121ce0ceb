//! Credential secrets, credential pairs, and identity metadata.

pub mod credentials;
pub mod id;
pub mod identity;
pub mod secret;

pub use credentials::*;
pub use id::*;
pub use identity::*;
pub use secret::*;
