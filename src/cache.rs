//! TTL cache contract, the in-memory backend, and the token validation cache built on top.

pub mod validation;

pub use validation::ValidationCache;

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	store::StoreFuture,
};

/// Key-value cache with per-entry lifetimes.
///
/// Single-key operations are atomic. Expired entries read as absent.
pub trait Cache
where
	Self: Send + Sync,
{
	/// Reads a live entry.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>>;

	/// Stores `value` for `ttl`; a non-positive `ttl` stores nothing.
	fn put<'a>(&'a self, key: &'a str, value: Value, ttl: Duration) -> StoreFuture<'a, ()>;

	/// Removes an entry.
	fn forget<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}
impl dyn Cache {
	/// Returns the live entry under `key`, or computes, stores, and returns a fresh one.
	///
	/// A producer returning `None` leaves the cache untouched. Backend failures are logged
	/// and degrade to a miss or to an unstored value.
	pub async fn remember<F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Option<Value>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Option<Value>>,
	{
		match self.get(key).await {
			Ok(Some(value)) => return Some(value),
			Ok(None) => {},
			Err(e) => tracing::warn!(key, error = %e, "Cache read failed; treating as a miss."),
		}

		let value = producer().await?;

		if let Err(e) = self.put(key, value.clone(), ttl).await {
			tracing::warn!(key, error = %e, "Cache write failed; value was not stored.");
		}

		Some(value)
	}
}

#[derive(Clone, Debug)]
struct CacheEntry {
	value: Value,
	expires_at: OffsetDateTime,
}

/// In-process [`Cache`] driven by a [`Clock`]; clones share the same entries.
///
/// Expired entries are dropped when read and swept on every write.
#[derive(Clone)]
pub struct MemoryCache {
	entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
	clock: Arc<dyn Clock>,
}
impl MemoryCache {
	/// Creates an empty cache reading time from `clock`.
	pub fn new(clock: Arc<dyn Clock>) -> Self {
		Self { entries: Default::default(), clock }
	}

	/// Number of stored entries, including expired ones not yet swept.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns `true` when `key` holds a live entry.
	pub fn contains(&self, key: &str) -> bool {
		self.read_now(key).is_some()
	}

	/// Drops every expired entry.
	pub fn purge_expired(&self) {
		let now = self.clock.now();

		self.entries.write().retain(|_, entry| entry.expires_at > now);
	}

	fn read_now(&self, key: &str) -> Option<Value> {
		let now = self.clock.now();

		{
			let entries = self.entries.read();

			match entries.get(key) {
				Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
				Some(_) => {},
				None => return None,
			}
		}

		let mut entries = self.entries.write();

		// Another writer may have refreshed the entry in between.
		if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
			entries.remove(key);
		}

		entries.get(key).map(|entry| entry.value.clone())
	}
}
impl Default for MemoryCache {
	fn default() -> Self {
		Self::new(Arc::new(SystemClock))
	}
}
impl Debug for MemoryCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MemoryCache").field("entries", &self.len()).finish()
	}
}
impl Cache for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
		Box::pin(async move { Ok(self.read_now(key)) })
	}

	fn put<'a>(&'a self, key: &'a str, value: Value, ttl: Duration) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			if !ttl.is_positive() {
				self.entries.write().remove(key);

				return Ok(());
			}

			let now = self.clock.now();
			let expires_at = now.saturating_add(ttl);
			let mut entries = self.entries.write();

			entries.retain(|_, entry| entry.expires_at > now);
			entries.insert(key.to_owned(), CacheEntry { value, expires_at });

			Ok(())
		})
	}

	fn forget<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.entries.write().remove(key);

			Ok(())
		})
	}
}
