//! Token status snapshots.

// self
use crate::{_prelude::*, auth::User, flows::AuthOrchestrator};

/// Authentication status of a user, suitable for JSON responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserStatus {
	/// A user is present.
	pub is_authenticated: bool,
	/// The user's token currently validates.
	pub has_valid_token: bool,
	/// Expiry of the user's token.
	#[serde(with = "time::serde::rfc3339::option")]
	pub token_expires_at: Option<OffsetDateTime>,
	/// The token expires within the refresh threshold.
	pub needs_refresh: bool,
}

impl AuthOrchestrator {
	/// Reports the status of `user`; `None` yields an unauthenticated status.
	pub async fn check_user_status(&self, user: Option<&User>) -> UserStatus {
		let Some(user) = user else {
			return UserStatus::default();
		};

		UserStatus {
			is_authenticated: true,
			has_valid_token: self.validate_user_token(user).await,
			token_expires_at: user.token_expires_at(),
			needs_refresh: user.needs_refresh_at(self.now(), self.config.refresh_window()),
		}
	}
}
