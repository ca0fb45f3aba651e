//! Framework-neutral view of an incoming request and its per-request authentication state.
//!
//! Host frameworks translate their request type into an [`AuthRequest`] and wrap it in a
//! [`RequestContext`] together with the client's session. The context lives for one request:
//! guard resolutions and queued cookies never leak into another request.

// self
use crate::{
	_prelude::*,
	auth::{GuardName, TokenSecret, User},
	store::{MemorySessionStore, SessionStore},
};

/// Headers, cookies, and query parameters of an incoming request.
///
/// Header names are case-insensitive; cookie and query names are exact.
#[derive(Clone, Default)]
pub struct AuthRequest {
	headers: HashMap<String, String>,
	cookies: HashMap<String, String>,
	query: HashMap<String, String>,
}
impl AuthRequest {
	/// Creates an empty request.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a header, replacing any previous value.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Adds a cookie.
	pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.cookies.insert(name.into(), value.into());

		self
	}

	/// Adds a query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.insert(name.into(), value.into());

		self
	}

	/// Shortcut for `Authorization: Bearer {token}`.
	pub fn with_bearer(self, token: impl AsRef<str>) -> Self {
		let value = format!("Bearer {}", token.as_ref());

		self.with_header("authorization", value)
	}

	/// Reads a header.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Reads a cookie.
	pub fn cookie(&self, name: &str) -> Option<&str> {
		self.cookies.get(name).map(String::as_str)
	}

	/// Reads a query parameter.
	pub fn query(&self, name: &str) -> Option<&str> {
		self.query.get(name).map(String::as_str)
	}

	/// Token carried by an `Authorization: Bearer` header.
	///
	/// The scheme is matched case-insensitively; an empty credential reads as absent.
	pub fn bearer_token(&self) -> Option<TokenSecret> {
		let value = self.header("authorization")?.trim();
		let (scheme, credential) = value.split_once(char::is_whitespace)?;

		if !scheme.eq_ignore_ascii_case("bearer") {
			return None;
		}

		TokenSecret::non_empty(credential.trim())
	}

	/// Returns `true` for API-style requests that expect a JSON error instead of a redirect.
	pub fn expects_json(&self) -> bool {
		let accepts_json = self
			.header("accept")
			.is_some_and(|accept| accept.to_ascii_lowercase().contains("json"));
		let is_xhr = self
			.header("x-requested-with")
			.is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"));

		accepts_json || is_xhr
	}
}
impl Debug for AuthRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthRequest")
			.field("headers", &self.headers.keys().collect::<Vec<_>>())
			.field("cookies", &self.cookies.keys().collect::<Vec<_>>())
			.field("query", &self.query.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Outgoing cookie queued during a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedCookie {
	/// Cookie name.
	pub name: String,
	/// Value to set; `None` expires the cookie.
	pub value: Option<TokenSecret>,
	/// Lifetime; zero for expiring cookies.
	pub max_age: Duration,
}
impl QueuedCookie {
	/// Returns `true` when the cookie instructs the client to drop it.
	pub fn is_expiry(&self) -> bool {
		self.value.is_none()
	}
}

/// Cookies to attach to the response; the latest instruction per name wins.
#[derive(Debug, Default)]
pub struct CookieJar(Mutex<Vec<QueuedCookie>>);
impl CookieJar {
	/// Queues a cookie carrying `value` for `ttl`.
	pub fn queue(&self, name: impl Into<String>, value: TokenSecret, ttl: Duration) {
		self.push(QueuedCookie { name: name.into(), value: Some(value), max_age: ttl });
	}

	/// Queues an instruction to drop the cookie.
	pub fn expire(&self, name: impl Into<String>) {
		self.push(QueuedCookie { name: name.into(), value: None, max_age: Duration::ZERO });
	}

	/// Snapshot of the queued cookies.
	pub fn queued(&self) -> Vec<QueuedCookie> {
		self.0.lock().clone()
	}

	/// Latest instruction for `name`.
	pub fn get(&self, name: &str) -> Option<QueuedCookie> {
		self.0.lock().iter().find(|cookie| cookie.name == name).cloned()
	}

	fn push(&self, cookie: QueuedCookie) {
		let mut queued = self.0.lock();

		queued.retain(|existing| existing.name != cookie.name);
		queued.push(cookie);
	}
}

/// Per-guard resolution state within one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
	/// No resolution has run yet.
	#[default]
	Unresolved,
	/// The request is authenticated as this user.
	Resolved(User),
	/// Resolution ran and found no authenticated user.
	Denied,
}
impl Resolution {
	/// Resolved user, if any.
	pub fn user(&self) -> Option<&User> {
		match self {
			Resolution::Resolved(user) => Some(user),
			_ => None,
		}
	}
}

/// One request's inputs and authentication state.
pub struct RequestContext {
	request: AuthRequest,
	session: Arc<dyn SessionStore>,
	cookies: CookieJar,
	resolutions: Mutex<HashMap<GuardName, Resolution>>,
}
impl RequestContext {
	/// Wraps `request` together with the client's session.
	pub fn new(request: AuthRequest, session: Arc<dyn SessionStore>) -> Self {
		Self { request, session, cookies: CookieJar::default(), resolutions: Default::default() }
	}

	/// Wraps a stateless request (API clients) with an empty throwaway session.
	pub fn stateless(request: AuthRequest) -> Self {
		Self::new(request, Arc::new(MemorySessionStore::default()))
	}

	/// Incoming request.
	pub fn request(&self) -> &AuthRequest {
		&self.request
	}

	/// Session bound to the request.
	pub fn session(&self) -> &dyn SessionStore {
		self.session.as_ref()
	}

	/// Cookies queued for the response.
	pub fn cookies(&self) -> &CookieJar {
		&self.cookies
	}

	/// Current resolution of `guard`.
	pub fn resolution(&self, guard: &GuardName) -> Resolution {
		self.resolutions.lock().get(guard).cloned().unwrap_or_default()
	}

	/// Records the resolution of `guard`.
	pub fn set_resolution(&self, guard: &GuardName, resolution: Resolution) {
		self.resolutions.lock().insert(guard.clone(), resolution);
	}
}
impl Debug for RequestContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestContext")
			.field("request", &self.request)
			.field("cookies", &self.cookies)
			.field("resolutions", &self.resolutions.lock().len())
			.finish()
	}
}
