//! Successful outcomes of remote authority calls.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Identity returned by the authority (`user` object of the login response).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
	/// Subject identifier at the authority.
	pub id: u64,
	/// Email address; used as the local upsert key.
	pub email: String,
	/// Display name.
	pub name: String,
}

/// Successful login/validate/refresh result.
///
/// Failures never produce an `AuthResult`; they surface as [`Error`] values from the
/// [`RemoteAuthClient`](crate::http::RemoteAuthClient). Which fields are present depends on
/// the endpoint: login carries all three, refresh carries the token and expiry, validate may
/// carry none.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthResult {
	/// Identity, when the endpoint returns one.
	pub user: Option<RemoteUser>,
	/// Newly issued bearer token.
	pub token: Option<TokenSecret>,
	/// Expiry of the issued token.
	pub expires_at: Option<OffsetDateTime>,
}
