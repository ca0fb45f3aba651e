//! Token rotation with singleflight guards, CAS replacement, and metrics.
//!
//! Each refresh acquires a guard keyed by the user and the digest of the token being
//! replaced. A caller that obtains the guard after another caller already rotated the token
//! receives the rotated user without contacting the authority. Successful rotations go through
//! [`UserStore::compare_and_swap_token`](crate::store::UserStore::compare_and_swap_token) and
//! always drop the validation entry of the pre-refresh token.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{StoredToken, TokenSecret, User},
	error::AuthorityError,
	flows::{
		AuthOrchestrator,
		common::{self, RefreshKey},
	},
	http::Endpoint,
	locator::SESSION_KEY,
	obs::{self, AuthFlow, FlowOutcome, FlowSpan},
	store::{CompareAndSwapOutcome, SessionStore},
};

impl AuthOrchestrator {
	/// Rotates the user's token; returns `true` on success.
	///
	/// See [`AuthOrchestrator::refresh_user`].
	pub async fn refresh_user_token(
		&self,
		user: &User,
		session: Option<&dyn SessionStore>,
	) -> bool {
		self.refresh_user(user, session).await.is_some()
	}

	/// Rotates the user's token and returns the updated user.
	///
	/// On success the stored token and expiry are replaced atomically, the validation entry of
	/// the old token is dropped, and `session` is updated when it still holds the old token
	/// (a missing session entry is never created). On failure nothing changes locally.
	pub async fn refresh_user(
		&self,
		user: &User,
		session: Option<&dyn SessionStore>,
	) -> Option<User> {
		const FLOW: AuthFlow = AuthFlow::Refresh;

		let Some(token) = user.token_secret() else {
			tracing::debug!(user_id = %user.id, "Refresh skipped; user holds no token.");

			return None;
		};
		let span = FlowSpan::new(FLOW, "refresh_user");

		obs::record_flow_outcome(FLOW, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span.instrument(self.rotate(user, token)).await;
		let refreshed = match result {
			Ok(Some(refreshed)) => refreshed,
			Ok(None) => {
				self.refresh_metrics.record_failure();
				obs::record_flow_outcome(FLOW, FlowOutcome::Failure);

				return None;
			},
			Err(e) => {
				self.refresh_metrics.record_failure();
				obs::record_flow_outcome(FLOW, FlowOutcome::Failure);
				tracing::warn!(user_id = %user.id, error = %e, "Token refresh failed.");

				return None;
			},
		};

		if let (Some(session), Some(new_token)) = (session, refreshed.token_secret()) {
			sync_session(session, token, new_token);
		}

		obs::record_flow_outcome(FLOW, FlowOutcome::Success);

		Some(refreshed)
	}

	async fn rotate(&self, user: &User, token: &TokenSecret) -> Result<Option<User>> {
		let key = RefreshKey { user_id: user.id, digest: self.validation.digest(token) };
		let guard = common::flow_guard(self, &key);
		let result = {
			let _singleflight = guard.lock().await;

			self.rotate_locked(user, token).await
		};

		common::release_flow_guard(self, &key, guard);

		result
	}

	async fn rotate_locked(&self, user: &User, token: &TokenSecret) -> Result<Option<User>> {
		let Some(current) = self.users.find_by_id(user.id).await? else {
			tracing::debug!(user_id = %user.id, "Refresh skipped; user no longer exists.");

			return Ok(None);
		};

		match current.token_secret() {
			Some(stored) if stored == token => {},
			Some(_) => {
				tracing::debug!(user_id = %user.id, "Token already rotated; reusing the result.");
				self.refresh_metrics.record_reuse();

				return Ok(Some(current));
			},
			None => {
				tracing::debug!(user_id = %user.id, "Refresh skipped; token was cleared.");

				return Ok(None);
			},
		}

		let result = self.client.refresh_token(token).await?;
		let secret = result.token.ok_or(AuthorityError::IncompleteResponse {
			endpoint: Endpoint::Refresh,
			field: "token",
		})?;
		let replacement = StoredToken::new(secret, result.expires_at);
		let outcome = common::replace_token(
			self.users.as_ref(),
			&self.validation,
			user.id,
			token,
			replacement.clone(),
		)
		.await?;

		match outcome {
			CompareAndSwapOutcome::Updated => {
				let mut refreshed = current;

				refreshed.token = Some(replacement);
				self.refresh_metrics.record_success();
				tracing::info!(user_id = %user.id, "Token refreshed.");

				Ok(Some(refreshed))
			},
			CompareAndSwapOutcome::TokenMismatch => {
				// Rotated concurrently outside this process; keep the stored winner.
				let latest = self.users.find_by_id(user.id).await?;

				if latest.as_ref().is_some_and(|latest| latest.token.is_some()) {
					self.refresh_metrics.record_reuse();

					Ok(latest)
				} else {
					Ok(None)
				}
			},
			CompareAndSwapOutcome::Missing => Ok(None),
		}
	}
}

fn sync_session(session: &dyn SessionStore, old: &TokenSecret, new: &TokenSecret) {
	if session.get(SESSION_KEY).as_ref() == Some(old) {
		session.put(SESSION_KEY, new.clone());
	}
}
