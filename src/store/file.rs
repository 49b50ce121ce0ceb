//! File-backed [`SessionPersistence`] so a remembered login survives restarts.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{PersistedSession, SessionPersistence, StoreError},
};

/// Persists the durable session snapshot as JSON, replacing the file atomically on save.
#[derive(Clone, Debug)]
pub struct FilePersistence {
	path: PathBuf,
}
impl FilePersistence {
	/// Targets the provided path, creating its parent directory when missing.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create session directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}
}
impl SessionPersistence for FilePersistence {
	fn load(&self) -> Result<Option<PersistedSession>, StoreError> {
		let bytes = match fs::read(&self.path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", self.path.display()),
				}),
		};

		if bytes.is_empty() {
			return Ok(None);
		}

		let snapshot: PersistedSession =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", self.path.display()),
			})?;

		Ok((!snapshot.is_empty()).then_some(snapshot))
	}

	fn save(&self, snapshot: &PersistedSession) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	fn clear(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", self.path.display()),
			}),
		}
	}
}
