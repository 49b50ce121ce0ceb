//! Session storage: the in-memory [`SessionStore`] and its durable persistence contract.
//!
//! The store exclusively owns the credential pair and identity. Every mutation goes through
//! its narrow interface ([`SessionStore::login`], [`SessionStore::set_access`],
//! [`SessionStore::logout`], [`SessionStore::clear_must_reauthenticate`]) and is applied as
//! one synchronous step under a write lock, so no caller can observe a half-updated session.
//!
//! Only the refresh credential and identity are written through to a
//! [`SessionPersistence`] backend. The access credential is volatile: after a restart the
//! session comes back unauthenticated and the first request renews it.

pub mod file;
pub mod memory;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;

// self
use crate::{
	_prelude::*,
	auth::{CredentialPair, CredentialSecret, Identity},
	obs,
};

/// Durable projection of a session: everything that survives a process restart.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
	/// Long-lived refresh credential, when the login asked to be remembered.
	pub refresh: Option<CredentialSecret>,
	/// Identity metadata of the logged-in account.
	pub identity: Option<Identity>,
}
impl PersistedSession {
	/// Returns `true` when nothing worth persisting remains.
	pub fn is_empty(&self) -> bool {
		self.refresh.is_none() && self.identity.is_none()
	}
}

/// Storage backend contract for the durable part of a session.
///
/// Calls happen inside the store's write lock, so implementations must be quick and must not
/// call back into the store.
pub trait SessionPersistence
where
	Self: Send + Sync,
{
	/// Loads the last persisted snapshot, if any.
	fn load(&self) -> Result<Option<PersistedSession>, StoreError>;

	/// Persists or replaces the snapshot.
	fn save(&self, snapshot: &PersistedSession) -> Result<(), StoreError>;

	/// Removes any persisted snapshot.
	fn clear(&self) -> Result<(), StoreError>;
}

/// Error type produced by [`SessionPersistence`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Point-in-time copy of the session state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
	/// Volatile access credential; present iff the session is authenticated.
	pub access: Option<CredentialSecret>,
	/// Informational expiry hint for the access credential.
	pub access_expiry_hint: Option<OffsetDateTime>,
	/// Durable refresh credential.
	pub refresh: Option<CredentialSecret>,
	/// Durable identity metadata.
	pub identity: Option<Identity>,
	/// Monotonic counter bumped on every credential mutation.
	pub generation: u64,
}
impl Session {
	/// `true` iff an access credential is present.
	pub fn is_authenticated(&self) -> bool {
		self.access.is_some()
	}

	/// `true` while the identity demands a password change before anything else.
	pub fn must_reauthenticate(&self) -> bool {
		self.identity.as_ref().is_some_and(|identity| identity.must_reauthenticate)
	}

	/// `true` when the session still holds anything a renewal could revive.
	pub fn is_live(&self) -> bool {
		self.access.is_some() || self.refresh.is_some()
	}

	/// Returns the credential pair when authenticated.
	pub fn credentials(&self) -> Option<CredentialPair> {
		let access = self.access.clone()?;

		Some(CredentialPair {
			access,
			access_expiry_hint: self.access_expiry_hint,
			refresh: self.refresh.clone(),
		})
	}

	fn persisted(&self) -> PersistedSession {
		PersistedSession { refresh: self.refresh.clone(), identity: self.identity.clone() }
	}
}

/// Result of a guarded access-credential replacement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessUpdate {
	/// The access credential was replaced.
	Updated,
	/// The session now carries a different refresh credential (a new login happened).
	RefreshMismatch,
	/// The session was logged out in the meantime.
	LoggedOut,
}

/// Exclusive owner of the current session.
pub struct SessionStore {
	session: RwLock<Session>,
	persistence: Arc<dyn SessionPersistence>,
}
impl SessionStore {
	/// Creates an empty, unauthenticated store backed by `persistence`.
	///
	/// Nothing is loaded; use [`SessionStore::restore`] to pick up a previous session.
	pub fn new(persistence: Arc<dyn SessionPersistence>) -> Self {
		Self { session: RwLock::new(Session::default()), persistence }
	}

	/// Creates an empty store whose durable state lives only in memory.
	pub fn in_memory() -> Self {
		Self::new(Arc::new(MemoryPersistence::default()))
	}

	/// Opens a store and reloads the refresh credential and identity from `persistence`.
	///
	/// The restored session is unauthenticated (no access credential) until the first
	/// request triggers a renewal.
	pub fn restore(persistence: Arc<dyn SessionPersistence>) -> Result<Self, StoreError> {
		let snapshot = persistence.load()?.unwrap_or_default();
		let session = Session {
			refresh: snapshot.refresh,
			identity: snapshot.identity,
			..Session::default()
		};

		Ok(Self { session: RwLock::new(session), persistence })
	}

	/// Returns the current session snapshot.
	pub fn get(&self) -> Session {
		self.session.read().clone()
	}

	/// Current access credential together with the generation it belongs to.
	pub fn access_credential(&self) -> (Option<CredentialSecret>, u64) {
		let session = self.session.read();

		(session.access.clone(), session.generation)
	}

	/// Current refresh credential.
	pub fn refresh_credential(&self) -> Option<CredentialSecret> {
		self.session.read().refresh.clone()
	}

	/// Current identity metadata.
	pub fn identity(&self) -> Option<Identity> {
		self.session.read().identity.clone()
	}

	/// Current credential generation.
	pub fn generation(&self) -> u64 {
		self.session.read().generation
	}

	/// Replaces the entire session with a freshly issued credential pair and identity.
	pub fn login(
		&self,
		credentials: CredentialPair,
		mut identity: Identity,
		must_reauthenticate: bool,
	) {
		identity.must_reauthenticate = must_reauthenticate;

		let mut session = self.session.write();
		let generation = session.generation.wrapping_add(1);

		*session = Session {
			access: Some(credentials.access),
			access_expiry_hint: credentials.access_expiry_hint,
			refresh: credentials.refresh,
			identity: Some(identity),
			generation,
		};

		self.persist_locked("login", &session);
	}

	/// Replaces only the access credential after a successful renewal.
	///
	/// Returns `false` without touching anything when the session has been logged out, so a
	/// late renewal never resurrects a dead session.
	pub fn set_access(&self, new_access: CredentialSecret) -> bool {
		let mut session = self.session.write();

		if !session.is_live() {
			return false;
		}

		Self::apply_access(&mut session, new_access);

		true
	}

	/// Replaces the access credential only if the session still carries `expected_refresh`.
	pub fn compare_and_set_access(
		&self,
		expected_refresh: &CredentialSecret,
		new_access: CredentialSecret,
	) -> AccessUpdate {
		let mut session = self.session.write();
		let outcome = if !session.is_live() {
			AccessUpdate::LoggedOut
		} else if session.refresh.as_ref() == Some(expected_refresh) {
			AccessUpdate::Updated
		} else {
			AccessUpdate::RefreshMismatch
		};

		if matches!(outcome, AccessUpdate::Updated) {
			Self::apply_access(&mut session, new_access);
		}

		outcome
	}

	/// Clears every field back to the unauthenticated state.
	///
	/// Idempotent; returns `true` only when there was something to clear.
	pub fn logout(&self) -> bool {
		let mut session = self.session.write();

		if !session.is_live() && session.identity.is_none() {
			return false;
		}

		let generation = session.generation.wrapping_add(1);

		*session = Session { generation, ..Session::default() };

		if let Err(e) = self.persistence.clear() {
			obs::persistence_failed("logout", &e);
		}

		true
	}

	/// Clears the forced-reauthentication flag without touching credentials.
	///
	/// Returns `false` when there is no identity or the flag was already clear.
	pub fn clear_must_reauthenticate(&self) -> bool {
		let mut session = self.session.write();
		let Some(identity) = session.identity.as_mut() else {
			return false;
		};

		if !identity.must_reauthenticate {
			return false;
		}

		identity.must_reauthenticate = false;

		self.persist_locked("clear_must_reauthenticate", &session);

		true
	}

	fn apply_access(session: &mut Session, new_access: CredentialSecret) {
		session.access = Some(new_access);
		session.access_expiry_hint = None;
		session.generation = session.generation.wrapping_add(1);
	}

	fn persist_locked(&self, operation: &'static str, session: &Session) {
		if let Err(e) = self.persistence.save(&session.persisted()) {
			obs::persistence_failed(operation, &e);
		}
	}
}
impl Default for SessionStore {
	fn default() -> Self {
		Self::in_memory()
	}
}
impl Debug for SessionStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionStore").field("session", &*self.session.read()).finish()
	}
}
