//! Token discovery on incoming requests.

// self
use crate::{_prelude::*, auth::TokenSecret, config::SsoConfig, request::RequestContext};

/// Session key holding the bearer token.
pub const SESSION_KEY: &str = "sso_token";
/// Cookie carrying the bearer token.
pub const COOKIE_NAME: &str = "sso_token";
/// Query parameter carrying the bearer token (opt-in).
pub const QUERY_PARAM: &str = "token";

/// Where a located token came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSource {
	/// `Authorization: Bearer` header.
	Header,
	/// Server-side session.
	Session,
	/// `sso_token` cookie.
	Cookie,
	/// `token` query parameter.
	Query,
}
impl TokenSource {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenSource::Header => "header",
			TokenSource::Session => "session",
			TokenSource::Cookie => "cookie",
			TokenSource::Query => "query",
		}
	}
}
impl Display for TokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token found on a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedToken {
	/// Bearer token.
	pub token: TokenSecret,
	/// Request part it was read from.
	pub source: TokenSource,
}

/// Extracts a candidate token with fixed precedence: header, session, cookie, then query.
///
/// The query parameter is only consulted when explicitly allowed. Empty values are skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenLocator {
	allow_query_token: bool,
}
impl TokenLocator {
	/// Creates a locator.
	pub fn new(allow_query_token: bool) -> Self {
		Self { allow_query_token }
	}

	/// Reads `allow_query_token` from the configuration.
	pub fn from_config(config: &SsoConfig) -> Self {
		Self::new(config.allow_query_token)
	}

	/// Returns the first token found, without side effects.
	pub fn locate(&self, ctx: &RequestContext) -> Option<LocatedToken> {
		let request = ctx.request();
		let found = |token, source| Some(LocatedToken { token, source });

		if let Some(token) = request.bearer_token() {
			return found(token, TokenSource::Header);
		}
		if let Some(token) = ctx.session().get(SESSION_KEY).filter(|t| !t.expose().is_empty()) {
			return found(token, TokenSource::Session);
		}
		if let Some(token) = request.cookie(COOKIE_NAME).and_then(TokenSecret::non_empty) {
			return found(token, TokenSource::Cookie);
		}
		if !self.allow_query_token {
			return None;
		}

		request
			.query(QUERY_PARAM)
			.and_then(TokenSecret::non_empty)
			.and_then(|token| found(token, TokenSource::Query))
	}
}
