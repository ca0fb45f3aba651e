//! Shared helpers for flow implementations (singleflight guards, token replacement).

// self
use crate::{
	_prelude::*,
	auth::{StoredToken, TokenDigest, TokenSecret, UserId},
	cache::ValidationCache,
	flows::AuthOrchestrator,
	store::{CompareAndSwapOutcome, StoreError, UserStore},
};

/// Singleflight key: one rotation per user and pre-refresh token.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RefreshKey {
	pub(crate) user_id: UserId,
	pub(crate) digest: TokenDigest,
}

/// Returns (and creates on demand) the singleflight guard for a refresh key.
pub(crate) fn flow_guard(orchestrator: &AuthOrchestrator, key: &RefreshKey) -> Arc<AsyncMutex<()>> {
	let mut guards = orchestrator.flow_guards.lock();

	guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Drops the guard entry once no other caller holds or awaits it.
pub(crate) fn release_flow_guard(
	orchestrator: &AuthOrchestrator,
	key: &RefreshKey,
	guard: Arc<AsyncMutex<()>>,
) {
	let mut guards = orchestrator.flow_guards.lock();

	// One reference lives in the map, the other is `guard`.
	if Arc::strong_count(&guard) <= 2 {
		guards.remove(key);
	}
}

/// Rotates a user's token from `old` to `replacement`.
///
/// The stale digest is derived from `old` before the store is touched and its validation entry
/// is dropped whatever the swap outcome.
pub(crate) async fn replace_token(
	users: &dyn UserStore,
	validation: &ValidationCache,
	user_id: UserId,
	old: &TokenSecret,
	replacement: StoredToken,
) -> Result<CompareAndSwapOutcome, StoreError> {
	let stale = validation.digest(old);
	let outcome = users.compare_and_swap_token(user_id, old, replacement).await;

	validation.invalidate(user_id, &stale).await;

	outcome
}
