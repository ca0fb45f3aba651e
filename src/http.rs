//! Transport seam towards the SSO authority.
//!
//! [`RemoteAuthClient`] is the core's only dependency on an HTTP stack. The bundled
//! [`ReqwestAuthClient`] speaks the authority's wire contract:
//!
//! | Endpoint | Auth | Body | Success body |
//! |---|---|---|---|
//! | `POST /api/sso/login` | none | `{email, password, app_slug}` | `{user, token, expires_at}` |
//! | `POST /api/sso/validate` | bearer | `{app_slug}` | any |
//! | `POST /api/sso/refresh` | bearer | `{app_slug}` | `{token, expires_at}` |
//! | `POST /api/sso/logout` | bearer | none | any |
//!
//! `user` is `{id, email, name}`; `expires_at` is RFC 3339 or `null`.
//!
//! Every call is bounded by the configured timeout and wrapped in a fixed-delay
//! [`RetryPolicy`]; callers only ever observe the final outcome.

#[cfg(feature = "reqwest")] pub mod retry;

#[cfg(feature = "reqwest")] pub use retry::RetryPolicy;

// crates.io
#[cfg(feature = "reqwest")]
use reqwest::header::{ACCEPT, CONTENT_TYPE};
#[cfg(feature = "reqwest")] use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, auth::{AuthResult, TokenSecret}};
#[cfg(feature = "reqwest")]
use crate::{
	auth::{AppSlug, RemoteUser},
	config::SsoConfig,
	error::{AuthorityError, ConfigError, TransportError},
};

/// Boxed future returned by [`RemoteAuthClient`] calls.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Authority endpoints used by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
	/// Credential exchange.
	Login,
	/// Token validity probe.
	Validate,
	/// Token rotation.
	Refresh,
	/// Token revocation.
	Logout,
}
impl Endpoint {
	/// Returns the final path segment (`/api/sso/{segment}`).
	pub const fn as_str(self) -> &'static str {
		match self {
			Endpoint::Login => "login",
			Endpoint::Validate => "validate",
			Endpoint::Refresh => "refresh",
			Endpoint::Logout => "logout",
		}
	}
}
impl Display for Endpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Calls against the SSO authority.
///
/// Implementations own timeout and retry handling. A rejected call (non-success status)
/// is an [`Error::Authority`]; an unreachable authority is an [`Error::Transport`].
pub trait RemoteAuthClient
where
	Self: Send + Sync,
{
	/// Exchanges credentials for a token and the remote identity.
	fn login<'a>(&'a self, email: &'a str, password: &'a str) -> RemoteFuture<'a, AuthResult>;

	/// Asks the authority whether `token` is still valid.
	fn validate_token<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, AuthResult>;

	/// Rotates `token`, returning its replacement.
	fn refresh_token<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, AuthResult>;

	/// Revokes `token`; `Ok(false)` means the authority answered with a failure status.
	fn logout<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, bool>;
}

/// Reqwest-backed [`RemoteAuthClient`].
///
/// Redirects are never followed: the authority answers its endpoints directly.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestAuthClient {
	client: ReqwestClient,
	app_slug: AppSlug,
	endpoints: EndpointUrls,
	retry: RetryPolicy,
}
#[cfg(feature = "reqwest")]
impl ReqwestAuthClient {
	/// Builds a client with the configured timeout and retry policy.
	pub fn new(config: &SsoConfig) -> Result<Self> {
		let client = ReqwestClient::builder()
			.timeout(config.request_timeout())
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Self::with_client(config, client)
	}

	/// Wraps an existing reqwest client; its own timeout settings apply.
	pub fn with_client(config: &SsoConfig, client: ReqwestClient) -> Result<Self> {
		config.validate()?;

		Ok(Self {
			client,
			app_slug: config.app_slug.clone(),
			endpoints: EndpointUrls::from_config(config)?,
			retry: RetryPolicy::from_config(config),
		})
	}

	/// Retry policy applied to every call.
	pub fn retry_policy(&self) -> RetryPolicy {
		self.retry
	}

	async fn post(
		&self,
		endpoint: Endpoint,
		bearer: Option<&TokenSecret>,
		body: Option<Vec<u8>>,
	) -> Result<(u16, Vec<u8>)> {
		let url = self.endpoints.get(endpoint);

		self.retry
			.run(endpoint, || {
				let mut request = self.client.post(url.clone()).header(ACCEPT, "application/json");

				if let Some(token) = bearer {
					request = request.bearer_auth(token.expose());
				}
				if let Some(body) = &body {
					request = request.header(CONTENT_TYPE, "application/json").body(body.clone());
				}

				async move {
					let response =
						request.send().await.map_err(|e| map_reqwest_error(endpoint, e))?;
					let status = response.status();
					let bytes = response
						.bytes()
						.await
						.map_err(|e| map_reqwest_error(endpoint, e))?
						.to_vec();

					if !status.is_success() {
						return Err(AuthorityError::Rejected {
							endpoint,
							status: status.as_u16(),
							message: rejection_message(&bytes),
						}
						.into());
					}

					Ok((status.as_u16(), bytes))
				}
			})
			.await
	}

	fn app_body(&self) -> Result<Vec<u8>> {
		encode(&AppBody { app_slug: &self.app_slug })
	}
}
#[cfg(feature = "reqwest")]
impl RemoteAuthClient for ReqwestAuthClient {
	fn login<'a>(&'a self, email: &'a str, password: &'a str) -> RemoteFuture<'a, AuthResult> {
		Box::pin(async move {
			let body = encode(&LoginBody { email, password, app_slug: &self.app_slug })?;
			let (status, bytes) = self.post(Endpoint::Login, None, Some(body)).await?;
			let response: LoginResponse = decode(Endpoint::Login, status, &bytes)?;

			Ok(AuthResult {
				user: Some(response.user),
				token: Some(response.token),
				expires_at: response.expires_at,
			})
		})
	}

	fn validate_token<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, AuthResult> {
		Box::pin(async move {
			let body = self.app_body()?;
			let (_, bytes) = self.post(Endpoint::Validate, Some(token), Some(body)).await?;
			// Any 2xx means valid; the body is informational only.
			let response = serde_json::from_slice::<ValidateResponse>(&bytes).unwrap_or_default();

			Ok(AuthResult { user: response.user, token: None, expires_at: response.expires_at })
		})
	}

	fn refresh_token<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, AuthResult> {
		Box::pin(async move {
			let body = self.app_body()?;
			let (status, bytes) = self.post(Endpoint::Refresh, Some(token), Some(body)).await?;
			let response: RefreshResponse = decode(Endpoint::Refresh, status, &bytes)?;

			Ok(AuthResult {
				user: None,
				token: Some(response.token),
				expires_at: response.expires_at,
			})
		})
	}

	fn logout<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, bool> {
		Box::pin(async move {
			match self.post(Endpoint::Logout, Some(token), None).await {
				Ok(_) => Ok(true),
				Err(Error::Authority(AuthorityError::Rejected { .. })) => Ok(false),
				Err(e) => Err(e),
			}
		})
	}
}
#[cfg(feature = "reqwest")]
impl Debug for ReqwestAuthClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReqwestAuthClient")
			.field("app_slug", &self.app_slug)
			.field("login", &self.endpoints.login.as_str())
			.field("retry", &self.retry)
			.finish()
	}
}

#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
struct EndpointUrls {
	login: Url,
	validate: Url,
	refresh: Url,
	logout: Url,
}
#[cfg(feature = "reqwest")]
impl EndpointUrls {
	fn from_config(config: &SsoConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			login: config.endpoint_url(Endpoint::Login)?,
			validate: config.endpoint_url(Endpoint::Validate)?,
			refresh: config.endpoint_url(Endpoint::Refresh)?,
			logout: config.endpoint_url(Endpoint::Logout)?,
		})
	}

	fn get(&self, endpoint: Endpoint) -> &Url {
		match endpoint {
			Endpoint::Login => &self.login,
			Endpoint::Validate => &self.validate,
			Endpoint::Refresh => &self.refresh,
			Endpoint::Logout => &self.logout,
		}
	}
}

#[cfg(feature = "reqwest")]
#[derive(Serialize)]
struct LoginBody<'a> {
	email: &'a str,
	password: &'a str,
	app_slug: &'a str,
}

#[cfg(feature = "reqwest")]
#[derive(Serialize)]
struct AppBody<'a> {
	app_slug: &'a str,
}

#[cfg(feature = "reqwest")]
#[derive(Deserialize)]
struct LoginResponse {
	user: RemoteUser,
	token: TokenSecret,
	#[serde(default, with = "time::serde::rfc3339::option")]
	expires_at: Option<OffsetDateTime>,
}

#[cfg(feature = "reqwest")]
#[derive(Deserialize)]
struct RefreshResponse {
	token: TokenSecret,
	#[serde(default, with = "time::serde::rfc3339::option")]
	expires_at: Option<OffsetDateTime>,
}

#[cfg(feature = "reqwest")]
#[derive(Default, Deserialize)]
struct ValidateResponse {
	#[serde(default)]
	user: Option<RemoteUser>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	expires_at: Option<OffsetDateTime>,
}

#[cfg(feature = "reqwest")]
#[derive(Deserialize)]
struct ErrorBody {
	message: String,
}

#[cfg(feature = "reqwest")]
fn encode<T>(body: &T) -> Result<Vec<u8>>
where
	T: Serialize,
{
	serde_json::to_vec(body).map_err(|e| TransportError::Io(e.into()).into())
}

#[cfg(feature = "reqwest")]
fn decode<T>(endpoint: Endpoint, status: u16, bytes: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| AuthorityError::MalformedResponse { endpoint, status, source }.into())
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::http_client_build(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { endpoint }.into();
	}

	TransportError::network(err).into()
}

#[cfg(feature = "reqwest")]
fn rejection_message(bytes: &[u8]) -> String {
	const PREVIEW_LIMIT: usize = 256;

	if let Ok(body) = serde_json::from_slice::<ErrorBody>(bytes) {
		return body.message;
	}

	let text = String::from_utf8_lossy(bytes);
	let text = text.trim();

	if text.is_empty() {
		return "no message".into();
	}

	text.chars().take(PREVIEW_LIMIT).collect()
}
