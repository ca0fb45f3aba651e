//! Token lifecycle orchestration: login, validation, refresh, logout, and status queries.
//!
//! Every public operation on [`AuthOrchestrator`] swallows collaborator errors: failures are
//! logged through `tracing` and surface as `None`/`false` so callers never handle transport or
//! storage errors themselves.

pub mod refresh;
pub mod status;

mod common;
mod login;
mod logout;
mod validate;

pub use refresh::RefreshMetrics;
pub use status::UserStatus;

// self
use crate::{
	_prelude::*,
	cache::{Cache, ValidationCache},
	clock::{Clock, SystemClock},
	config::SsoConfig,
	flows::common::RefreshKey,
	http::RemoteAuthClient,
	store::UserStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestAuthClient;

/// Coordinates the SSO authority, the user store, and the caches.
///
/// Construct one per application and share it behind an [`Arc`]; it is cheap to clone.
#[derive(Clone)]
pub struct AuthOrchestrator {
	/// Client configuration.
	pub config: Arc<SsoConfig>,
	/// Transport towards the SSO authority.
	pub client: Arc<dyn RemoteAuthClient>,
	/// Local user records.
	pub users: Arc<dyn UserStore>,
	/// Cache shared by validation results and login profiles.
	pub cache: Arc<dyn Cache>,
	/// Shared metrics recorder for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	clock: Arc<dyn Clock>,
	validation: ValidationCache,
	flow_guards: Arc<Mutex<HashMap<RefreshKey, Arc<AsyncMutex<()>>>>>,
}
impl AuthOrchestrator {
	/// Creates an orchestrator reading time from the system clock.
	pub fn new(
		config: SsoConfig,
		client: Arc<dyn RemoteAuthClient>,
		users: Arc<dyn UserStore>,
		cache: Arc<dyn Cache>,
	) -> Self {
		let validation = ValidationCache::from_config(&config, cache.clone(), client.clone());

		Self {
			config: Arc::new(config),
			client,
			users,
			cache,
			refresh_metrics: Default::default(),
			clock: Arc::new(SystemClock),
			validation,
			flow_guards: Default::default(),
		}
	}

	/// Creates an orchestrator backed by the reqwest transport built from `config`.
	#[cfg(feature = "reqwest")]
	pub fn with_reqwest(
		config: SsoConfig,
		users: Arc<dyn UserStore>,
		cache: Arc<dyn Cache>,
	) -> Result<Self> {
		let client = ReqwestAuthClient::new(&config)?;

		Ok(Self::new(config, Arc::new(client), users, cache))
	}

	/// Replaces the time source used for expiry checks.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Validation cache used by [`AuthOrchestrator::validate_user_token`].
	pub fn validation(&self) -> &ValidationCache {
		&self.validation
	}

	/// Current instant according to the configured clock.
	pub fn now(&self) -> OffsetDateTime {
		self.clock.now()
	}
}
impl Debug for AuthOrchestrator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthOrchestrator")
			.field("auth_server_url", &self.config.auth_server_url.as_str())
			.field("app_slug", &self.config.app_slug)
			.field("validation", &self.validation)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
