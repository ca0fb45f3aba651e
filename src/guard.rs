//! Request guards resolving incoming requests to authenticated users.
//!
//! A [`Guard`] is stateless and shared across requests; per-request state lives in the
//! [`RequestContext`]. [`SessionGuard`] is the bearer-token guard; [`GuardRegistry`] maps guard
//! names to instances for the [`AuthBoundary`](crate::boundary::AuthBoundary).

pub mod registry;
pub mod session;

pub use registry::GuardRegistry;
pub use session::SessionGuard;

// self
use crate::{
	_prelude::*,
	auth::{GuardName, TokenSecret, User},
	request::RequestContext,
};

/// Boxed future returned by [`Guard`] operations.
pub type GuardFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;

/// Per-request authentication capability.
///
/// No operation returns an error: failures resolve to "not authenticated".
pub trait Guard
where
	Self: Send + Sync,
{
	/// Registry name of the guard.
	fn name(&self) -> &GuardName;

	/// Resolves the request to a user; resolves at most once per request.
	fn user<'a>(&'a self, ctx: &'a RequestContext) -> GuardFuture<'a, Option<User>>;

	/// Returns `true` when the request resolves to a user.
	fn check<'a>(&'a self, ctx: &'a RequestContext) -> GuardFuture<'a, bool> {
		Box::pin(async move { self.user(ctx).await.is_some() })
	}

	/// Authenticates `credentials` and logs the resulting user into the request.
	fn attempt<'a>(
		&'a self,
		ctx: &'a RequestContext,
		credentials: &'a Credentials,
		remember: bool,
	) -> GuardFuture<'a, bool>;

	/// Logs an already-authenticated user (one holding a token) into the request.
	fn login<'a>(
		&'a self,
		ctx: &'a RequestContext,
		user: User,
		remember: bool,
	) -> GuardFuture<'a, bool>;

	/// Logs the request out; the request is unauthenticated afterwards whatever happens.
	fn logout<'a>(&'a self, ctx: &'a RequestContext) -> GuardFuture<'a, ()>;
}

/// Email and password pair submitted to the authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
	/// Account email.
	pub email: String,
	/// Account password.
	pub password: TokenSecret,
}
impl Credentials {
	/// Creates a credential pair.
	pub fn new(email: impl Into<String>, password: impl Into<TokenSecret>) -> Self {
		Self { email: email.into(), password: password.into() }
	}

	/// Returns `true` when either field is empty; such pairs never reach the authority.
	pub fn is_incomplete(&self) -> bool {
		self.email.trim().is_empty() || self.password.expose().is_empty()
	}
}
