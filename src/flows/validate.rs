//! Token validity checks backed by the validation cache.

// self
use crate::{
	_prelude::*,
	auth::User,
	flows::AuthOrchestrator,
	obs::{self, AuthFlow, FlowOutcome, FlowSpan},
};

impl AuthOrchestrator {
	/// Returns `true` when the user's token is currently accepted by the authority.
	///
	/// A missing token or a local expiry in the past short-circuits to `false` without a
	/// remote call; otherwise the answer comes from the validation cache.
	pub async fn validate_user_token(&self, user: &User) -> bool {
		const FLOW: AuthFlow = AuthFlow::Validate;

		if user.token.is_none() {
			return false;
		}
		if user.is_token_expired_at(self.now()) {
			tracing::debug!(user_id = %user.id, "Token expired locally; skipping validation.");

			return false;
		}

		let span = FlowSpan::new(FLOW, "validate_user_token");

		obs::record_flow_outcome(FLOW, FlowOutcome::Attempt);

		let valid = span.instrument(self.validation.is_valid(user)).await;

		obs::record_flow_outcome(FLOW, FlowOutcome::from_success(valid));

		valid
	}
}
