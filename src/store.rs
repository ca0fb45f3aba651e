//! Storage contracts and built-in store implementations for users and sessions.

pub mod file;
pub mod memory;

pub use file::FileUserStore;
pub use memory::{MemorySessionStore, MemoryUserStore};

// self
use crate::{
	_prelude::*,
	auth::{StoredToken, TokenSecret, User, UserId},
};

/// Boxed future returned by asynchronous store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for local user records.
///
/// Every operation is atomic for a single user.
pub trait UserStore
where
	Self: Send + Sync,
{
	/// Finds the user currently holding `token`.
	fn find_by_token<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, Option<User>>;

	/// Finds a user by local id.
	fn find_by_id(&self, id: UserId) -> StoreFuture<'_, Option<User>>;

	/// Creates or updates the user keyed by `upsert.email`.
	fn upsert_by_email(&self, upsert: UserUpsert) -> StoreFuture<'_, User>;

	/// Applies a field update, returning the updated user when it exists.
	fn update(&self, id: UserId, update: UserUpdate) -> StoreFuture<'_, Option<User>>;

	/// Atomically replaces the user's token if it still equals `expected`.
	fn compare_and_swap_token<'a>(
		&'a self,
		id: UserId,
		expected: &'a TokenSecret,
		replacement: StoredToken,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Key-value session attached to one client session.
///
/// Sessions are small and local, so the contract is synchronous.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Reads the token stored under `key`.
	fn get(&self, key: &str) -> Option<TokenSecret>;

	/// Stores `token` under `key`, replacing any previous value.
	fn put(&self, key: &str, token: TokenSecret);

	/// Removes the value stored under `key`.
	fn forget(&self, key: &str);
}

/// Fields written by [`UserStore::upsert_by_email`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserUpsert {
	/// Unique key.
	pub email: String,
	/// Display name.
	pub name: String,
	/// Subject identifier at the authority.
	pub remote_id: Option<u64>,
	/// Token to mirror; `None` clears any existing token.
	pub token: Option<StoredToken>,
	/// Last successful login.
	pub last_login_at: Option<OffsetDateTime>,
}

/// Token change carried by a [`UserUpdate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TokenUpdate {
	/// Leave the token untouched.
	#[default]
	Keep,
	/// Replace the token and its expiry.
	Set(StoredToken),
	/// Remove the token and its expiry.
	Clear,
}

/// Partial field update for [`UserStore::update`]; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserUpdate {
	/// New display name.
	pub name: Option<String>,
	/// New remote subject id.
	pub remote_id: Option<u64>,
	/// Token change.
	pub token: TokenUpdate,
	/// New last-login timestamp.
	pub last_login_at: Option<OffsetDateTime>,
}
impl UserUpdate {
	/// Update that removes the token and its expiry.
	pub fn clear_token() -> Self {
		Self { token: TokenUpdate::Clear, ..Default::default() }
	}

	/// Update that replaces the token and its expiry.
	pub fn set_token(token: StoredToken) -> Self {
		Self { token: TokenUpdate::Set(token), ..Default::default() }
	}

	/// Applies the update to `user` in place.
	pub fn apply(self, user: &mut User) {
		if let Some(name) = self.name {
			user.name = name;
		}
		if let Some(remote_id) = self.remote_id {
			user.remote_id = Some(remote_id);
		}
		if let Some(last_login_at) = self.last_login_at {
			user.last_login_at = Some(last_login_at);
		}

		match self.token {
			TokenUpdate::Keep => {},
			TokenUpdate::Set(token) => user.token = Some(token),
			TokenUpdate::Clear => user.token = None,
		}
	}
}

/// Result of a token compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The token matched the expected value and was replaced.
	Updated,
	/// The user exists but holds a different token (or none).
	TokenMismatch,
	/// No user matched the provided id.
	Missing,
}

/// Error type produced by store implementations.
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

/// User table shared by the memory and file backends.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct UserTable {
	next_id: u64,
	users: BTreeMap<UserId, User>,
}
impl UserTable {
	pub(crate) fn len(&self) -> usize {
		self.users.len()
	}

	pub(crate) fn find_by_token(&self, token: &TokenSecret) -> Option<User> {
		self.users.values().find(|user| user.token_secret() == Some(token)).cloned()
	}

	pub(crate) fn find_by_id(&self, id: UserId) -> Option<User> {
		self.users.get(&id).cloned()
	}

	pub(crate) fn upsert(&mut self, upsert: UserUpsert) -> User {
		let existing =
			self.users.values().find(|user| user.email == upsert.email).map(|user| user.id);

		if let Some(user) = existing.and_then(|id| self.users.get_mut(&id)) {
			user.name = upsert.name;
			user.remote_id = upsert.remote_id.or(user.remote_id);
			user.token = upsert.token;
			user.last_login_at = upsert.last_login_at.or(user.last_login_at);

			return user.clone();
		}

		self.next_id += 1;

		let user = User {
			id: UserId(self.next_id),
			email: upsert.email,
			name: upsert.name,
			remote_id: upsert.remote_id,
			token: upsert.token,
			last_login_at: upsert.last_login_at,
		};

		self.users.insert(user.id, user.clone());

		user
	}

	pub(crate) fn update(&mut self, id: UserId, update: UserUpdate) -> Option<User> {
		let user = self.users.get_mut(&id)?;

		update.apply(user);

		Some(user.clone())
	}

	pub(crate) fn compare_and_swap_token(
		&mut self,
		id: UserId,
		expected: &TokenSecret,
		replacement: StoredToken,
	) -> CompareAndSwapOutcome {
		match self.users.get_mut(&id) {
			Some(user) if user.token_secret() == Some(expected) => {
				user.token = Some(replacement);

				CompareAndSwapOutcome::Updated
			},
			Some(_) => CompareAndSwapOutcome::TokenMismatch,
			None => CompareAndSwapOutcome::Missing,
		}
	}
}
