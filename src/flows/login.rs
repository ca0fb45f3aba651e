//! Credential exchange and local user mirroring.

// self
use crate::{
	_prelude::*,
	auth::{RemoteUser, StoredToken, User},
	error::AuthorityError,
	flows::AuthOrchestrator,
	http::Endpoint,
	obs::{self, AuthFlow, FlowOutcome, FlowSpan},
	store::UserUpsert,
};

impl AuthOrchestrator {
	/// Exchanges credentials with the authority and mirrors the result locally.
	///
	/// The user is upserted by email with the new token, expiry, remote id, name, and login
	/// time. The remote profile (never the token) is cached for `token_cache_duration`.
	pub async fn login(&self, email: &str, password: &str) -> Option<User> {
		const FLOW: AuthFlow = AuthFlow::Login;

		let span = FlowSpan::new(FLOW, "login");

		obs::record_flow_outcome(FLOW, FlowOutcome::Attempt);

		match span.instrument(self.exchange_credentials(email, password)).await {
			Ok(user) => {
				obs::record_flow_outcome(FLOW, FlowOutcome::Success);
				tracing::info!(
					user_id = %user.id,
					app_slug = %self.config.app_slug,
					"SSO login succeeded."
				);

				Some(user)
			},
			Err(e) => {
				obs::record_flow_outcome(FLOW, FlowOutcome::Failure);
				tracing::warn!(app_slug = %self.config.app_slug, error = %e, "SSO login failed.");

				None
			},
		}
	}

	/// Profile cached by the last login of `remote_id`, while still live.
	pub async fn cached_profile(&self, remote_id: u64) -> Option<RemoteUser> {
		let value = match self.cache.get(&profile_key(remote_id)).await {
			Ok(value) => value?,
			Err(e) => {
				tracing::warn!(remote_id, error = %e, "Profile cache read failed.");

				return None;
			},
		};

		serde_json::from_value(value)
			.inspect_err(|e| tracing::warn!(remote_id, error = %e, "Cached profile is malformed."))
			.ok()
	}

	async fn exchange_credentials(&self, email: &str, password: &str) -> Result<User> {
		let result = self.client.login(email, password).await?;
		let missing =
			|field| AuthorityError::IncompleteResponse { endpoint: Endpoint::Login, field };
		let remote = result.user.ok_or_else(|| missing("user"))?;
		let token = result.token.ok_or_else(|| missing("token"))?;
		let user = self
			.users
			.upsert_by_email(UserUpsert {
				email: remote.email.clone(),
				name: remote.name.clone(),
				remote_id: Some(remote.id),
				token: Some(StoredToken::new(token, result.expires_at)),
				last_login_at: Some(self.now()),
			})
			.await?;

		self.cache_profile(&remote).await;

		Ok(user)
	}

	async fn cache_profile(&self, remote: &RemoteUser) {
		let value = match serde_json::to_value(remote) {
			Ok(value) => value,
			Err(e) => {
				tracing::warn!(remote_id = remote.id, error = %e, "Profile could not be encoded.");

				return;
			},
		};

		if let Err(e) =
			self.cache.put(&profile_key(remote.id), value, self.config.token_cache_ttl()).await
		{
			tracing::warn!(remote_id = remote.id, error = %e, "Profile cache write failed.");
		}
	}
}

/// Cache key of a login profile.
fn profile_key(remote_id: u64) -> String {
	format!("sso_user:{remote_id}")
}
