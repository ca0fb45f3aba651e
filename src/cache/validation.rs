//! Short-lived memo of "is this user's token currently valid".

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{TokenDigest, TokenDigester, TokenSecret, User, UserId},
	cache::Cache,
	config::SsoConfig,
	http::RemoteAuthClient,
};

/// Validation results keyed by `sso_validate:{user_id}:{token_digest}`.
///
/// Authority rejections are cached as `false`. Failures where the authority could not give an
/// answer (network errors, timeouts, 5xx/429 after retries) read as invalid but are not cached.
#[derive(Clone)]
pub struct ValidationCache {
	cache: Arc<dyn Cache>,
	client: Arc<dyn RemoteAuthClient>,
	digester: TokenDigester,
	ttl: Duration,
}
impl ValidationCache {
	/// Creates a validation cache with an explicit TTL.
	pub fn new(
		cache: Arc<dyn Cache>,
		client: Arc<dyn RemoteAuthClient>,
		digester: TokenDigester,
		ttl: Duration,
	) -> Self {
		Self { cache, client, digester, ttl }
	}

	/// Creates a validation cache using `secret_key` and `validation_cache_duration`.
	pub fn from_config(
		config: &SsoConfig,
		cache: Arc<dyn Cache>,
		client: Arc<dyn RemoteAuthClient>,
	) -> Self {
		Self::new(
			cache,
			client,
			TokenDigester::new(config.secret_key.clone()),
			config.validation_cache_ttl(),
		)
	}

	/// Cache key for a user's token digest.
	pub fn key(user_id: UserId, digest: &TokenDigest) -> String {
		format!("sso_validate:{user_id}:{digest}")
	}

	/// Digests `token` with the configured key.
	pub fn digest(&self, token: &TokenSecret) -> TokenDigest {
		self.digester.digest(token)
	}

	/// Lifetime of cached results.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Returns the cached validity of the user's token, asking the authority on a miss.
	///
	/// A user without a token is never valid.
	pub async fn is_valid(&self, user: &User) -> bool {
		let Some(token) = user.token_secret() else {
			return false;
		};
		let digest = self.digest(token);
		let key = Self::key(user.id, &digest);
		let verdict = self
			.cache
			.remember(&key, self.ttl, || self.ask_authority(user.id, &digest, token))
			.await;

		verdict.and_then(|value| value.as_bool()).unwrap_or(false)
	}

	/// Removes the entry for `digest`; callers pass the digest of the token being replaced.
	pub async fn invalidate(&self, user_id: UserId, digest: &TokenDigest) {
		let key = Self::key(user_id, digest);

		if let Err(e) = self.cache.forget(&key).await {
			tracing::warn!(user_id = %user_id, error = %e, "Failed to drop validation entry.");
		}
	}

	async fn ask_authority(
		&self,
		user_id: UserId,
		digest: &TokenDigest,
		token: &TokenSecret,
	) -> Option<Value> {
		match self.client.validate_token(token).await {
			Ok(_) => Some(Value::Bool(true)),
			Err(e @ Error::Authority(_)) if !e.is_retryable() => {
				tracing::debug!(
					user_id = %user_id,
					digest = %digest,
					error = %e,
					"Authority rejected the token."
				);

				Some(Value::Bool(false))
			},
			Err(e) => {
				tracing::warn!(
					user_id = %user_id,
					digest = %digest,
					transport = e.is_transport(),
					error = %e,
					"Token validation could not reach a verdict; treating as invalid."
				);

				None
			},
		}
	}
}
impl Debug for ValidationCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ValidationCache")
			.field("digester", &self.digester)
			.field("ttl", &self.ttl)
			.finish()
	}
}
