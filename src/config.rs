//! Client configuration: authority location, cache lifetimes, guard defaults, and retry policy.
//!
//! [`SsoConfig`] deserializes from any serde source (missing optional fields fall back to the
//! defaults below) or from `SSO_*` environment variables via [`SsoConfig::from_env`]. Minute,
//! second, and millisecond fields keep the units of the configuration surface; use the
//! accessor methods to obtain typed durations.

// self
use crate::{
	_prelude::*,
	auth::{AppSlug, GuardName, TokenSecret},
	error::ConfigError,
	http::Endpoint,
};

const DEFAULT_AUTH_SERVER_URL: &str = "http://app1.local";
const DEFAULT_TOKEN_CACHE_MINUTES: u64 = 1_440;
const DEFAULT_VALIDATION_CACHE_MINUTES: u64 = 5;
const DEFAULT_LOGIN_ROUTE: &str = "/login";
const DEFAULT_GUARD: &str = "sso";
const DEFAULT_REFRESH_THRESHOLD_MINUTES: u64 = 10;
const DEFAULT_REMEMBER_MINUTES: u64 = 43_200;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Settings shared by the orchestrator, guards, boundary, and HTTP client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SsoConfig {
	/// Base URL of the SSO authority.
	#[serde(default = "default_auth_server_url")]
	pub auth_server_url: Url,
	/// Application identifier sent with every call.
	pub app_slug: AppSlug,
	/// Key mixed into token digests.
	#[serde(default)]
	pub secret_key: Option<TokenSecret>,
	/// Lifetime of cached login profiles, in minutes.
	#[serde(default = "default_token_cache_duration")]
	pub token_cache_duration: u64,
	/// Lifetime of cached validation results, in minutes.
	#[serde(default = "default_validation_cache_duration")]
	pub validation_cache_duration: u64,
	/// Accept tokens from the `token` query parameter.
	#[serde(default)]
	pub allow_query_token: bool,
	/// Redirect target for unauthenticated browser requests.
	#[serde(default = "default_login_route")]
	pub login_route: String,
	/// Guard applied when a boundary names none.
	#[serde(default = "default_guard")]
	pub default_guard: GuardName,
	/// Window before expiry in which a token is reported as needing refresh, in minutes.
	#[serde(default = "default_refresh_threshold")]
	pub refresh_threshold: u64,
	/// Lifetime of the remember-me cookie, in minutes.
	#[serde(default = "default_remember_duration")]
	pub remember_duration: u64,
	/// Timeout of a single remote call, in seconds.
	#[serde(default = "default_timeout")]
	pub timeout: u64,
	/// Total attempts per remote call.
	#[serde(default = "default_retry_attempts")]
	pub retry_attempts: u32,
	/// Fixed delay between attempts, in milliseconds.
	#[serde(default = "default_retry_delay")]
	pub retry_delay: u64,
}
impl SsoConfig {
	/// Creates a configuration with default settings for the given authority and application.
	pub fn new(auth_server_url: Url, app_slug: AppSlug) -> Self {
		Self {
			auth_server_url,
			app_slug,
			secret_key: None,
			token_cache_duration: DEFAULT_TOKEN_CACHE_MINUTES,
			validation_cache_duration: DEFAULT_VALIDATION_CACHE_MINUTES,
			allow_query_token: false,
			login_route: DEFAULT_LOGIN_ROUTE.into(),
			default_guard: default_guard(),
			refresh_threshold: DEFAULT_REFRESH_THRESHOLD_MINUTES,
			remember_duration: DEFAULT_REMEMBER_MINUTES,
			timeout: DEFAULT_TIMEOUT_SECS,
			retry_attempts: DEFAULT_RETRY_ATTEMPTS,
			retry_delay: DEFAULT_RETRY_DELAY_MS,
		}
	}

	/// Reads the configuration from `SSO_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| std::env::var(var).ok())
	}

	/// Reads the configuration through `lookup`, which maps a variable name to its value.
	///
	/// `SSO_APP_SLUG` is required; every other variable falls back to its default.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let app_slug =
			lookup("SSO_APP_SLUG").ok_or(ConfigError::MissingVar { var: "SSO_APP_SLUG" })?;
		let auth_server_url = match lookup("SSO_AUTH_SERVER_URL") {
			Some(raw) =>
				Url::parse(&raw).map_err(|source| ConfigError::InvalidServerUrl { source })?,
			None => default_auth_server_url(),
		};
		let mut config = Self::new(auth_server_url, AppSlug::new(app_slug)?);

		config.secret_key = lookup("SSO_SECRET_KEY").and_then(TokenSecret::non_empty);
		config.token_cache_duration =
			parse_var(&lookup, "SSO_TOKEN_CACHE_DURATION", config.token_cache_duration)?;
		config.validation_cache_duration =
			parse_var(&lookup, "SSO_VALIDATION_CACHE_DURATION", config.validation_cache_duration)?;
		config.allow_query_token = parse_flag(&lookup, "SSO_ALLOW_QUERY_TOKEN", false)?;
		config.refresh_threshold =
			parse_var(&lookup, "SSO_REFRESH_THRESHOLD", config.refresh_threshold)?;
		config.remember_duration =
			parse_var(&lookup, "SSO_REMEMBER_DURATION", config.remember_duration)?;
		config.timeout = parse_var(&lookup, "SSO_TIMEOUT", config.timeout)?;
		config.retry_attempts = parse_var(&lookup, "SSO_RETRY_ATTEMPTS", config.retry_attempts)?;
		config.retry_delay = parse_var(&lookup, "SSO_RETRY_DELAY", config.retry_delay)?;

		if let Some(route) = lookup("SSO_LOGIN_ROUTE") {
			config.login_route = route;
		}
		if let Some(guard) = lookup("SSO_DEFAULT_GUARD") {
			config.default_guard = GuardName::new(guard)?;
		}

		config.validate()?;

		Ok(config)
	}

	/// Sets the key mixed into token digests.
	pub fn with_secret_key(mut self, key: impl Into<TokenSecret>) -> Self {
		self.secret_key = Some(key.into());

		self
	}

	/// Overrides the validation cache lifetime (minutes).
	pub fn with_validation_cache_duration(mut self, minutes: u64) -> Self {
		self.validation_cache_duration = minutes;

		self
	}

	/// Overrides the profile cache lifetime (minutes).
	pub fn with_token_cache_duration(mut self, minutes: u64) -> Self {
		self.token_cache_duration = minutes;

		self
	}

	/// Enables or disables query-parameter tokens.
	pub fn with_allow_query_token(mut self, allow: bool) -> Self {
		self.allow_query_token = allow;

		self
	}

	/// Overrides the login redirect target.
	pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
		self.login_route = route.into();

		self
	}

	/// Overrides the default guard name.
	pub fn with_default_guard(mut self, guard: GuardName) -> Self {
		self.default_guard = guard;

		self
	}

	/// Overrides the needs-refresh window (minutes).
	pub fn with_refresh_threshold(mut self, minutes: u64) -> Self {
		self.refresh_threshold = minutes;

		self
	}

	/// Overrides the remember-me cookie lifetime (minutes).
	pub fn with_remember_duration(mut self, minutes: u64) -> Self {
		self.remember_duration = minutes;

		self
	}

	/// Overrides the per-call timeout (seconds).
	pub fn with_timeout(mut self, seconds: u64) -> Self {
		self.timeout = seconds;

		self
	}

	/// Overrides the retry policy: total `attempts` separated by `delay_ms` milliseconds.
	pub fn with_retry(mut self, attempts: u32, delay_ms: u64) -> Self {
		self.retry_attempts = attempts;
		self.retry_delay = delay_ms;

		self
	}

	/// Checks value ranges and that the authority URL can carry endpoint paths.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let url = &self.auth_server_url;

		if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
			return Err(ConfigError::UnsupportedServerUrl { url: url.to_string() });
		}
		if self.retry_attempts == 0 {
			return Err(ConfigError::OutOfRange { field: "retry_attempts", min: 1 });
		}
		if self.timeout == 0 {
			return Err(ConfigError::OutOfRange { field: "timeout", min: 1 });
		}

		Ok(())
	}

	/// Absolute URL of an authority endpoint (`{auth_server_url}/api/sso/{endpoint}`).
	pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, ConfigError> {
		let mut url = self.auth_server_url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::UnsupportedServerUrl {
				url: self.auth_server_url.to_string(),
			})?
			.pop_if_empty()
			.extend(["api", "sso", endpoint.as_str()]);

		Ok(url)
	}

	/// Validation cache lifetime.
	pub fn validation_cache_ttl(&self) -> Duration {
		minutes(self.validation_cache_duration)
	}

	/// Profile cache lifetime.
	pub fn token_cache_ttl(&self) -> Duration {
		minutes(self.token_cache_duration)
	}

	/// Needs-refresh window.
	pub fn refresh_window(&self) -> Duration {
		minutes(self.refresh_threshold)
	}

	/// Remember-me cookie lifetime.
	pub fn remember_ttl(&self) -> Duration {
		minutes(self.remember_duration)
	}

	/// Per-call timeout.
	pub fn request_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.timeout)
	}

	/// Delay between retry attempts.
	pub fn retry_delay_duration(&self) -> std::time::Duration {
		std::time::Duration::from_millis(self.retry_delay)
	}
}

fn minutes(value: u64) -> Duration {
	const MAX_MINUTES: i64 = i64::MAX / 60;

	Duration::minutes(i64::try_from(value).unwrap_or(MAX_MINUTES).min(MAX_MINUTES))
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
{
	match lookup(var) {
		Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidVar { var, value: raw }),
		None => Ok(default),
	}
}

fn parse_flag<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let Some(raw) = lookup(var) else {
		return Ok(default);
	};

	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" | "" => Ok(false),
		_ => Err(ConfigError::InvalidVar { var, value: raw }),
	}
}

fn default_auth_server_url() -> Url {
	Url::parse(DEFAULT_AUTH_SERVER_URL).expect("Default auth server URL must parse.")
}

fn default_token_cache_duration() -> u64 {
	DEFAULT_TOKEN_CACHE_MINUTES
}

fn default_validation_cache_duration() -> u64 {
	DEFAULT_VALIDATION_CACHE_MINUTES
}

fn default_login_route() -> String {
	DEFAULT_LOGIN_ROUTE.into()
}

fn default_guard() -> GuardName {
	GuardName::new(DEFAULT_GUARD).expect("Default guard name must be valid.")
}

fn default_refresh_threshold() -> u64 {
	DEFAULT_REFRESH_THRESHOLD_MINUTES
}

fn default_remember_duration() -> u64 {
	DEFAULT_REMEMBER_MINUTES
}

fn default_timeout() -> u64 {
	DEFAULT_TIMEOUT_SECS
}

fn default_retry_attempts() -> u32 {
	DEFAULT_RETRY_ATTEMPTS
}

fn default_retry_delay() -> u64 {
	DEFAULT_RETRY_DELAY_MS
}
