//! Thread-safe in-memory [`SessionPersistence`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{PersistedSession, SessionPersistence, StoreError},
};

/// Keeps the durable session snapshot in-process; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct MemoryPersistence(Arc<RwLock<Option<PersistedSession>>>);
impl MemoryPersistence {
	/// Returns a copy of the currently persisted snapshot.
	pub fn snapshot(&self) -> Option<PersistedSession> {
		self.0.read().clone()
	}
}
impl SessionPersistence for MemoryPersistence {
	fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
		Ok(self.snapshot())
	}

	fn save(&self, snapshot: &PersistedSession) -> Result<(), StoreError> {
		*self.0.write() = Some(snapshot.clone());

		Ok(())
	}

	fn clear(&self) -> Result<(), StoreError> {
		self.0.write().take();

		Ok(())
	}
}
