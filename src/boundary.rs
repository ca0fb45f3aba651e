//! Route protection: apply guards in order and decide between "continue" and "reject".

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	auth::{GuardName, User},
	flows::AuthOrchestrator,
	guard::GuardRegistry,
	request::{RequestContext, Resolution},
};

const SESSION_EXPIRED: &str = "Session expired";
const UNAUTHENTICATED: &str = "Unauthenticated";

/// Rejection returned to an unauthenticated request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Unauthenticated {
	/// API-style request: respond with `status` and `{"message": message}`.
	Json {
		/// HTTP status code (always 401).
		status: u16,
		/// Human-readable reason.
		message: String,
	},
	/// Browser request: redirect to the login route.
	Redirect {
		/// Redirect target.
		location: String,
	},
}
impl Unauthenticated {
	/// HTTP status code to answer with.
	pub fn status(&self) -> u16 {
		match self {
			Unauthenticated::Json { status, .. } => *status,
			Unauthenticated::Redirect { .. } => 302,
		}
	}

	/// JSON body for API-style rejections.
	pub fn json_body(&self) -> Option<Value> {
		match self {
			Unauthenticated::Json { message, .. } => Some(json!({ "message": message })),
			Unauthenticated::Redirect { .. } => None,
		}
	}
}

/// Decision taken by [`AuthBoundary::authenticate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoundaryOutcome {
	/// The request may proceed as `user`.
	Authenticated {
		/// Guard that authenticated the request.
		guard: GuardName,
		/// Authenticated (possibly just refreshed) user.
		user: User,
	},
	/// The request must be rejected.
	Unauthenticated(Unauthenticated),
}
impl BoundaryOutcome {
	/// Authenticated user, if any.
	pub fn user(&self) -> Option<&User> {
		match self {
			BoundaryOutcome::Authenticated { user, .. } => Some(user),
			BoundaryOutcome::Unauthenticated(_) => None,
		}
	}
}

/// Middleware equivalent protecting routes with named guards.
#[derive(Clone, Debug)]
pub struct AuthBoundary {
	registry: GuardRegistry,
	orchestrator: Arc<AuthOrchestrator>,
	default_guard: GuardName,
	login_route: String,
}
impl AuthBoundary {
	/// Creates a boundary; the default guard and login route come from the configuration.
	pub fn new(registry: GuardRegistry, orchestrator: Arc<AuthOrchestrator>) -> Self {
		let default_guard = orchestrator.config.default_guard.clone();
		let login_route = orchestrator.config.login_route.clone();

		Self { registry, orchestrator, default_guard, login_route }
	}

	/// Guards consulted by this boundary.
	pub fn registry(&self) -> &GuardRegistry {
		&self.registry
	}

	/// Applies `guards` in order (the default guard when empty).
	///
	/// The first guard resolving a user wins. Its token is re-validated; an invalid token gets
	/// one refresh, and a failed refresh logs the guard out and rejects the request. Unknown
	/// guard names are skipped.
	pub async fn authenticate(
		&self,
		ctx: &RequestContext,
		guards: &[GuardName],
	) -> BoundaryOutcome {
		let names =
			if guards.is_empty() { std::slice::from_ref(&self.default_guard) } else { guards };

		for name in names {
			let Some(guard) = self.registry.get(name) else {
				tracing::warn!(guard = %name, "Unknown guard skipped.");

				continue;
			};
			let Some(user) = guard.user(ctx).await else {
				continue;
			};

			if self.orchestrator.validate_user_token(&user).await {
				return BoundaryOutcome::Authenticated { guard: name.clone(), user };
			}

			return match self.orchestrator.refresh_user(&user, Some(ctx.session())).await {
				Some(refreshed) => {
					ctx.set_resolution(name, Resolution::Resolved(refreshed.clone()));

					BoundaryOutcome::Authenticated { guard: name.clone(), user: refreshed }
				},
				None => {
					tracing::info!(
						guard = %name,
						user_id = %user.id,
						"Session expired; logging the guard out."
					);
					guard.logout(ctx).await;

					BoundaryOutcome::Unauthenticated(self.reject(ctx, SESSION_EXPIRED))
				},
			};
		}

		BoundaryOutcome::Unauthenticated(self.reject(ctx, UNAUTHENTICATED))
	}

	fn reject(&self, ctx: &RequestContext, message: &str) -> Unauthenticated {
		if ctx.request().expects_json() {
			Unauthenticated::Json { status: 401, message: message.into() }
		} else {
			Unauthenticated::Redirect { location: self.login_route.clone() }
		}
	}
}
