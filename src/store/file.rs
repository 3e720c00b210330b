//! JSON-file store for lightweight single-node deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{OAuthToken, UserId},
	catalog::Track,
	store::{FavoriteStore, StoreError, StoreFuture, StoreState, TokenStore},
};

/// Persists every record to one JSON snapshot after each mutation.
///
/// Snapshots are written to a sibling `.tmp` file and renamed into place, so a crash mid-write
/// leaves the previous snapshot intact.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<StoreState>>,
}
impl FileStore {
	/// Opens (or creates) a store at `path`, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let state = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(state)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn mutate<T>(&self, f: impl FnOnce(&mut StoreState) -> T) -> Result<T, StoreError> {
		let mut guard = self.inner.write();
		let mut next = guard.clone();
		let output = f(&mut next);

		persist(&self.path, &next)?;

		*guard = next;

		Ok(output)
	}
}
impl TokenStore for FileStore {
	fn save_token<'a>(&'a self, user: &'a UserId, token: OAuthToken) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.mutate(|state| state.put_token(user, token)) })
	}

	fn get_token<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<OAuthToken>> {
		Box::pin(async move { Ok(self.inner.read().token(user)) })
	}
}
impl FavoriteStore for FileStore {
	fn save_favorite<'a>(&'a self, user: &'a UserId, track: Track) -> StoreFuture<'a, bool> {
		Box::pin(async move { self.mutate(|state| state.add_favorite(user, track)) })
	}

	fn list_favorites<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Vec<Track>> {
		Box::pin(async move { Ok(self.inner.read().favorites(user)) })
	}
}

fn load_snapshot(path: &Path) -> Result<StoreState, StoreError> {
	if !path.exists() {
		return Ok(StoreState::default());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.is_empty() {
		return Ok(StoreState::default());
	}

	serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
		message: format!("Failed to parse {}: {e}", path.display()),
	})
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}

fn persist(path: &Path, state: &StoreState) -> Result<(), StoreError> {
	let serialized = serde_json::to_vec_pretty(state).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize store snapshot: {e}"),
	})?;
	let tmp_path = path.with_extension("tmp");

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

	fs::rename(&tmp_path, path).map_err(|e| StoreError::Backend {
		message: format!("Failed to replace {}: {e}", path.display()),
	})
}
