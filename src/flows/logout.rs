//! Token revocation and local cleanup.

// self
use crate::{
	_prelude::*,
	auth::User,
	flows::AuthOrchestrator,
	locator::SESSION_KEY,
	obs::{self, AuthFlow, FlowOutcome, FlowSpan},
	store::{SessionStore, UserUpdate},
};

impl AuthOrchestrator {
	/// Revokes the user's token remotely (best effort) and clears every local trace of it.
	///
	/// Remote failures are logged and never stop the cleanup: the stored token and expiry are
	/// cleared, the validation entry is dropped, and `session` forgets its token. Repeating the
	/// call is harmless.
	pub async fn logout_user(&self, user: &User, session: Option<&dyn SessionStore>) {
		const FLOW: AuthFlow = AuthFlow::Logout;

		let span = FlowSpan::new(FLOW, "logout_user");

		obs::record_flow_outcome(FLOW, FlowOutcome::Attempt);

		let revoked = span.instrument(self.revoke_and_clear(user)).await;

		if let Some(session) = session {
			session.forget(SESSION_KEY);
		}

		obs::record_flow_outcome(FLOW, FlowOutcome::from_success(revoked));
	}

	async fn revoke_and_clear(&self, user: &User) -> bool {
		let mut revoked = true;

		if let Some(token) = user.token_secret() {
			match self.client.logout(token).await {
				Ok(true) => tracing::debug!(user_id = %user.id, "Authority revoked the token."),
				Ok(false) => {
					revoked = false;

					tracing::warn!(user_id = %user.id, "Authority refused the logout.");
				},
				Err(e) => {
					revoked = false;

					tracing::warn!(user_id = %user.id, error = %e, "Remote logout failed.");
				},
			}

			let digest = self.validation.digest(token);

			self.validation.invalidate(user.id, &digest).await;
		}

		if let Err(e) = self.users.update(user.id, UserUpdate::clear_token()).await {
			revoked = false;

			tracing::error!(user_id = %user.id, error = %e, "Failed to clear the stored token.");
		}

		revoked
	}
}
