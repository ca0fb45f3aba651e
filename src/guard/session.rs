//! Bearer-token guard.
//!
//! Resolution of a request runs at most once per [`RequestContext`]:
//!
//! 1. a resolved or denied request answers from the context;
//! 2. the [`TokenLocator`] finds a token (none: denied);
//! 3. the user store maps the token to a user (none: denied);
//! 4. an expired local token is refreshed first (failure: denied);
//! 5. the validation cache is consulted; an invalid token gets one refresh (failure: denied);
//! 6. otherwise the request resolves to the user.
//!
//! Denied requests never mutate local state; a stale token stays in place so the next request
//! can try again.
//!
//! Logout never resolves: it acts on the resolved user, or else on the stored owner of the
//! located token, without contacting the authority before the revoke.

// self
use crate::{
	_prelude::*,
	auth::{GuardName, User, UserId},
	flows::{AuthOrchestrator, UserStatus},
	guard::{Credentials, Guard, GuardFuture},
	locator::{COOKIE_NAME, SESSION_KEY, TokenLocator},
	obs::{self, AuthFlow, FlowOutcome, FlowSpan},
	request::{RequestContext, Resolution},
};

/// Guard resolving requests through bearer tokens mirrored in the user store.
#[derive(Clone)]
pub struct SessionGuard {
	name: GuardName,
	orchestrator: Arc<AuthOrchestrator>,
	locator: TokenLocator,
}
impl SessionGuard {
	/// Creates a guard named `name`; the locator follows the orchestrator's configuration.
	pub fn new(name: GuardName, orchestrator: Arc<AuthOrchestrator>) -> Self {
		let locator = TokenLocator::from_config(&orchestrator.config);

		Self { name, orchestrator, locator }
	}

	/// Replaces the token locator.
	pub fn with_locator(mut self, locator: TokenLocator) -> Self {
		self.locator = locator;

		self
	}

	/// Orchestrator backing the guard.
	pub fn orchestrator(&self) -> &Arc<AuthOrchestrator> {
		&self.orchestrator
	}

	/// Returns `true` when the request does not resolve to a user.
	pub async fn guest(&self, ctx: &RequestContext) -> bool {
		!self.check(ctx).await
	}

	/// Local id of the resolved user.
	pub async fn id(&self, ctx: &RequestContext) -> Option<UserId> {
		self.user(ctx).await.map(|user| user.id)
	}

	/// Returns `true` when the request already resolved to a user; never triggers resolution.
	pub fn has_user(&self, ctx: &RequestContext) -> bool {
		matches!(ctx.resolution(&self.name), Resolution::Resolved(_))
	}

	/// Forces the request to resolve to `user`.
	pub fn set_user(&self, ctx: &RequestContext, user: User) {
		ctx.set_resolution(&self.name, Resolution::Resolved(user));
	}

	/// Returns `true` when the authority accepts `credentials`.
	///
	/// Incomplete credentials are rejected without a remote call.
	pub async fn validate_credentials(&self, credentials: &Credentials) -> bool {
		self.authenticate(credentials).await.is_some()
	}

	/// Authenticates `credentials` for this request only, without touching the session.
	pub async fn once(&self, ctx: &RequestContext, credentials: &Credentials) -> bool {
		match self.authenticate(credentials).await {
			Some(user) => {
				self.set_user(ctx, user);

				true
			},
			None => false,
		}
	}

	/// Logs in the stored user with local id `id`; only users holding a token qualify.
	pub async fn login_using_id(
		&self,
		ctx: &RequestContext,
		id: UserId,
		remember: bool,
	) -> Option<User> {
		let user = self.find_with_token(id).await?;

		if self.login(ctx, user.clone(), remember).await { Some(user) } else { None }
	}

	/// Like [`SessionGuard::login_using_id`], for this request only.
	pub async fn once_using_id(&self, ctx: &RequestContext, id: UserId) -> Option<User> {
		let user = self.find_with_token(id).await?;

		self.set_user(ctx, user.clone());

		Some(user)
	}

	/// Returns `true` when the request carries the remember-me cookie and resolves.
	pub async fn via_remember(&self, ctx: &RequestContext) -> bool {
		ctx.request().cookie(COOKIE_NAME).is_some_and(|value| !value.is_empty())
			&& self.check(ctx).await
	}

	/// Token status of the resolved user.
	pub async fn status(&self, ctx: &RequestContext) -> UserStatus {
		let user = self.user(ctx).await;

		self.orchestrator.check_user_status(user.as_ref()).await
	}

	async fn authenticate(&self, credentials: &Credentials) -> Option<User> {
		if credentials.is_incomplete() {
			tracing::debug!(guard = %self.name, "Incomplete credentials rejected locally.");

			return None;
		}

		self.orchestrator.login(&credentials.email, credentials.password.expose()).await
	}

	async fn find_with_token(&self, id: UserId) -> Option<User> {
		match self.orchestrator.users.find_by_id(id).await {
			Ok(Some(user)) if user.token.is_some() => Some(user),
			Ok(_) => {
				tracing::debug!(guard = %self.name, user_id = %id, "No token-holding user found.");

				None
			},
			Err(e) => {
				tracing::warn!(guard = %self.name, user_id = %id, error = %e, "Lookup failed.");

				None
			},
		}
	}

	/// Maps the request's token to its stored owner without contacting the authority.
	async fn find_by_located(&self, ctx: &RequestContext) -> Option<User> {
		let Some(located) = self.locator.locate(ctx) else {
			tracing::debug!(guard = %self.name, "No token on the request.");

			return None;
		};

		match self.orchestrator.users.find_by_token(&located.token).await {
			Ok(Some(user)) => Some(user),
			Ok(None) => {
				tracing::debug!(guard = %self.name, source = %located.source, "Unknown token.");

				None
			},
			Err(e) => {
				tracing::warn!(guard = %self.name, error = %e, "User lookup by token failed.");

				None
			},
		}
	}

	async fn resolve(&self, ctx: &RequestContext) -> Option<User> {
		let user = self.find_by_located(ctx).await?;
		let orchestrator = &self.orchestrator;
		let session = Some(ctx.session());
		let user = if user.is_token_expired_at(orchestrator.now()) {
			tracing::debug!(guard = %self.name, user_id = %user.id, "Token expired locally.");

			orchestrator.refresh_user(&user, session).await?
		} else {
			user
		};

		if orchestrator.validation().is_valid(&user).await {
			return Some(user);
		}

		tracing::debug!(guard = %self.name, user_id = %user.id, "Token rejected; refreshing.");

		orchestrator.refresh_user(&user, session).await
	}
}
impl Guard for SessionGuard {
	fn name(&self) -> &GuardName {
		&self.name
	}

	fn user<'a>(&'a self, ctx: &'a RequestContext) -> GuardFuture<'a, Option<User>> {
		Box::pin(async move {
			const FLOW: AuthFlow = AuthFlow::Resolve;

			match ctx.resolution(&self.name) {
				Resolution::Resolved(user) => return Some(user),
				Resolution::Denied => return None,
				Resolution::Unresolved => {},
			}

			let span = FlowSpan::new(FLOW, "session_guard");

			obs::record_flow_outcome(FLOW, FlowOutcome::Attempt);

			let resolved = span.instrument(self.resolve(ctx)).await;
			let resolution = match &resolved {
				Some(user) => Resolution::Resolved(user.clone()),
				None => Resolution::Denied,
			};

			ctx.set_resolution(&self.name, resolution);
			obs::record_flow_outcome(FLOW, FlowOutcome::from_success(resolved.is_some()));

			resolved
		})
	}

	fn attempt<'a>(
		&'a self,
		ctx: &'a RequestContext,
		credentials: &'a Credentials,
		remember: bool,
	) -> GuardFuture<'a, bool> {
		Box::pin(async move {
			match self.authenticate(credentials).await {
				Some(user) => self.login(ctx, user, remember).await,
				None => false,
			}
		})
	}

	fn login<'a>(
		&'a self,
		ctx: &'a RequestContext,
		user: User,
		remember: bool,
	) -> GuardFuture<'a, bool> {
		Box::pin(async move {
			let Some(token) = user.token_secret().cloned() else {
				tracing::warn!(
					guard = %self.name,
					user_id = %user.id,
					"Cannot log in a user without a token."
				);

				return false;
			};

			ctx.session().put(SESSION_KEY, token.clone());

			if remember {
				ctx.cookies().queue(COOKIE_NAME, token, self.orchestrator.config.remember_ttl());
			}

			tracing::debug!(guard = %self.name, user_id = %user.id, remember, "User logged in.");
			ctx.set_resolution(&self.name, Resolution::Resolved(user));

			true
		})
	}

	fn logout<'a>(&'a self, ctx: &'a RequestContext) -> GuardFuture<'a, ()> {
		Box::pin(async move {
			let user = match ctx.resolution(&self.name) {
				Resolution::Resolved(user) => Some(user),
				Resolution::Denied | Resolution::Unresolved => self.find_by_located(ctx).await,
			};

			if let Some(user) = user {
				self.orchestrator.logout_user(&user, Some(ctx.session())).await;
			}

			ctx.session().forget(SESSION_KEY);
			ctx.cookies().expire(COOKIE_NAME);
			ctx.set_resolution(&self.name, Resolution::Denied);
		})
	}
}
impl Debug for SessionGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionGuard")
			.field("name", &self.name)
			.field("locator", &self.locator)
			.finish()
	}
}
