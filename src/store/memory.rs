//! Thread-safe in-memory stores for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{StoredToken, TokenSecret, User, UserId},
	store::{
		CompareAndSwapOutcome, SessionStore, StoreFuture, UserStore, UserTable, UserUpdate,
		UserUpsert,
	},
};

/// In-process [`UserStore`]; clones share the same table.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserStore(Arc<RwLock<UserTable>>);
impl MemoryUserStore {
	/// Number of stored users.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no user has been stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl UserStore for MemoryUserStore {
	fn find_by_token<'a>(&'a self, token: &'a TokenSecret) -> StoreFuture<'a, Option<User>> {
		Box::pin(async move { Ok(self.0.read().find_by_token(token)) })
	}

	fn find_by_id(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
		Box::pin(async move { Ok(self.0.read().find_by_id(id)) })
	}

	fn upsert_by_email(&self, upsert: UserUpsert) -> StoreFuture<'_, User> {
		Box::pin(async move { Ok(self.0.write().upsert(upsert)) })
	}

	fn update(&self, id: UserId, update: UserUpdate) -> StoreFuture<'_, Option<User>> {
		Box::pin(async move { Ok(self.0.write().update(id, update)) })
	}

	fn compare_and_swap_token<'a>(
		&'a self,
		id: UserId,
		expected: &'a TokenSecret,
		replacement: StoredToken,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(
			async move { Ok(self.0.write().compare_and_swap_token(id, expected, replacement)) },
		)
	}
}

/// In-process [`SessionStore`]; clones share the same session.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore(Arc<RwLock<HashMap<String, TokenSecret>>>);
impl SessionStore for MemorySessionStore {
	fn get(&self, key: &str) -> Option<TokenSecret> {
		self.0.read().get(key).cloned()
	}

	fn put(&self, key: &str, token: TokenSecret) {
		self.0.write().insert(key.to_owned(), token);
	}

	fn forget(&self, key: &str) {
		self.0.write().remove(key);
	}
}
