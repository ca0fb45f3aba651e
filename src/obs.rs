//! Observability helpers for SSO flows.
//!
//! Every orchestrator flow runs inside an `sso_client.flow` span carrying the `flow` and `stage`
//! fields. With the `metrics` feature enabled, each attempt/success/failure also increments the
//! `sso_client_flow_total` counter, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthFlow {
	/// Credential exchange.
	Login,
	/// Token validity check.
	Validate,
	/// Token rotation.
	Refresh,
	/// Token revocation and local cleanup.
	Logout,
	/// Guard resolution of an incoming request.
	Resolve,
}
impl AuthFlow {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthFlow::Login => "login",
			AuthFlow::Validate => "validate",
			AuthFlow::Refresh => "refresh",
			AuthFlow::Logout => "logout",
			AuthFlow::Resolve => "resolve",
		}
	}
}
impl Display for AuthFlow {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller as `false`/`None`.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a boolean flow result onto an outcome label.
	pub const fn from_success(success: bool) -> Self {
		if success { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
