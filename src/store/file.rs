//! Simple file-backed [`UserStore`] for lightweight deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{StoredToken, TokenSecret, User, UserId},
	store::{
		CompareAndSwapOutcome, StoreError, StoreFuture, UserStore, UserTable, UserUpdate,
		UserUpsert,
	},
};

/// Persists the user table to a JSON file after each mutation.
///
/// The file holds bearer tokens in clear text; restrict its permissions accordingly.
#[derive(Clone, Debug)]
pub struct FileUserStore {
	path: PathBuf,
	inner: Arc<RwLock<UserTable>>,
}
impl FileUserStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<UserTable, StoreError> {
		if !path.exists() {
			return Ok(UserTable::default());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(UserTable::default());
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

	fn persist_locked(&self, table: &UserTable) -> Result<(), StoreError> {
		let serialized = serde_json::to_vec_pretty(table).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize user table: {e}"),
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
}
impl UserStore for FileUserStore {
	fn find_by_token<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, Option<User>> {
		Box::pin(async move { Ok(self.inner.read().find_by_token(token)) })
	}

	fn find_by_id(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
		Box::pin(async move { Ok(self.inner.read().find_by_id(id)) })
	}

	fn upsert_by_email(&self, upsert: UserUpsert) -> StoreFuture<'_, User> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let user = guard.upsert(upsert);

			self.persist_locked(&guard)?;

			Ok(user)
		})
	}

	fn update(&self, id: UserId, update: UserUpdate) -> StoreFuture<'_, Option<User>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let updated = guard.update(id, update);

			if updated.is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(updated)
		})
	}

	fn compare_and_swap_token<'a>(
		&'a self,
		id: UserId,
		expected: &'a TokenSecret,
		replacement: StoredToken,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let outcome = guard.compare_and_swap_token(id, expected, replacement);

			if matches!(outcome, CompareAndSwapOutcome::Updated) {
				self.persist_locked(&guard)?;
			}

			Ok(outcome)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use time::macros;
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"sso_client_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn mutations_survive_reopen() {
		let path = temp_path();
		let store = FileUserStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let expires_at = macros::datetime!(2025-01-01 12:00 UTC);
		let user = rt
			.block_on(store.upsert_by_email(UserUpsert {
				email: "ada@example.com".into(),
				name: "Ada".into(),
				remote_id: Some(7),
				token: Some(StoredToken::new("abc", Some(expires_at))),
				last_login_at: None,
			}))
			.expect("Upsert should persist.");
		let outcome = rt
			.block_on(store.compare_and_swap_token(
				user.id,
				&"abc".into(),
				StoredToken::new("xyz", Some(expires_at + Duration::hours(1))),
			))
			.expect("Compare-and-swap should persist.");

		assert_eq!(outcome, CompareAndSwapOutcome::Updated);

		drop(store);

		let reopened = FileUserStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.find_by_token(&"xyz".into()))
			.expect("Lookup should succeed.")
			.expect("File store lost the rotated user after reopen.");

		assert_eq!(fetched.id, user.id);
		assert_eq!(fetched.token_expires_at(), Some(expires_at + Duration::hours(1)));

		let next = rt
			.block_on(reopened.upsert_by_email(UserUpsert {
				email: "bob@example.com".into(),
				name: "Bob".into(),
				remote_id: None,
				token: None,
				last_login_at: None,
			}))
			.expect("Second upsert should persist.");

		assert_ne!(next.id, user.id);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
