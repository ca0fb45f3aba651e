//! Fixed-delay retry for authority calls.

// self
use crate::{_prelude::*, config::SsoConfig, http::Endpoint};

/// Bounded retry with a constant pause between attempts.
///
/// Only errors reporting [`Error::is_retryable`] trigger another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	attempts: u32,
	delay: std::time::Duration,
}
impl RetryPolicy {
	/// Creates a policy making at most `attempts` calls (never fewer than one).
	pub fn new(attempts: u32, delay: std::time::Duration) -> Self {
		Self { attempts: attempts.max(1), delay }
	}

	/// Reads `retry_attempts` and `retry_delay` from the configuration.
	pub fn from_config(config: &SsoConfig) -> Self {
		Self::new(config.retry_attempts, config.retry_delay_duration())
	}

	/// Total attempts per call.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Pause between attempts.
	pub fn delay(&self) -> std::time::Duration {
		self.delay
	}

	/// Runs `call` until it succeeds, fails terminally, or the attempts are exhausted.
	pub async fn run<T, F, Fut>(&self, endpoint: Endpoint, mut call: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut attempt = 1;

		loop {
			match call().await {
				Ok(value) => return Ok(value),
				Err(e) if attempt < self.attempts && e.is_retryable() => {
					tracing::debug!(
						endpoint = %endpoint,
						attempt,
						error = %e,
						"Retrying SSO call after a retryable failure."
					);

					if !self.delay.is_zero() {
						tokio::time::sleep(self.delay).await;
					}

					attempt += 1;
				},
				Err(e) => return Err(e),
			}
		}
	}
}
