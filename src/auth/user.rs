//! Local user records mirroring the authority's identity and token state.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Local primary key of a [`User`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);
impl Display for UserId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		Display::fmt(&self.0, f)
	}
}

/// Bearer token mirrored from the authority together with its expiry.
///
/// Keeping both in one value means a user either holds a token with its expiry or holds
/// neither; clearing the token can never leave a stale expiry behind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
	/// Opaque bearer token.
	pub secret: TokenSecret,
	/// Expiry reported by the authority, when it sent one.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl StoredToken {
	/// Creates a token entry.
	pub fn new(secret: impl Into<TokenSecret>, expires_at: Option<OffsetDateTime>) -> Self {
		Self { secret: secret.into(), expires_at }
	}

	/// Returns `true` when an expiry is known and `now` is past it.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| now > expires_at)
	}
}

/// Identity record owned by the user store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Local identifier.
	pub id: UserId,
	/// Email address; unique key for upserts.
	pub email: String,
	/// Display name.
	pub name: String,
	/// Subject identifier assigned by the authority.
	pub remote_id: Option<u64>,
	/// Current bearer token and its expiry.
	pub token: Option<StoredToken>,
	/// Last successful SSO login.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_login_at: Option<OffsetDateTime>,
}
impl User {
	/// Current bearer token, if any.
	pub fn token_secret(&self) -> Option<&TokenSecret> {
		self.token.as_ref().map(|token| &token.secret)
	}

	/// Expiry of the current token, if both are known.
	pub fn token_expires_at(&self) -> Option<OffsetDateTime> {
		self.token.as_ref().and_then(|token| token.expires_at)
	}

	/// Returns `true` when the local expiry is set and already passed.
	pub fn is_token_expired_at(&self, now: OffsetDateTime) -> bool {
		self.token.as_ref().is_some_and(|token| token.is_expired_at(now))
	}

	/// Returns `true` when the token expires within `threshold` of `now`.
	///
	/// A window reaching past the representable range covers every expiry.
	pub fn needs_refresh_at(&self, now: OffsetDateTime, threshold: Duration) -> bool {
		self.token_expires_at().is_some_and(|expires_at| {
			now.checked_add(threshold).is_none_or(|horizon| horizon > expires_at)
		})
	}
}
