//! Fixtures shared by the integration suites: a scripted authority and an orchestrator harness.

#![allow(dead_code)]

// std
use std::{
	collections::{HashMap, VecDeque},
	sync::Arc,
};
// crates.io
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime, macros};
// self
use sso_client::{
	auth::{AppSlug, AuthResult, GuardName, RemoteUser, StoredToken, TokenSecret, User},
	cache::MemoryCache,
	clock::ManualClock,
	config::SsoConfig,
	error::{AuthorityError, Error, Result, TransportError},
	flows::AuthOrchestrator,
	http::{Endpoint, RemoteAuthClient, RemoteFuture},
	store::{MemoryUserStore, UserStore, UserUpsert},
	url::Url,
};

/// Frozen starting instant of every harness clock.
pub const NOW: OffsetDateTime = macros::datetime!(2025-01-01 12:00 UTC);

/// Scripted answer of the stub authority.
#[derive(Clone, Debug)]
pub enum Reply {
	Ok(AuthResult),
	Reject(u16),
	Unreachable,
}
impl Reply {
	pub fn accept() -> Self {
		Self::Ok(AuthResult::default())
	}

	pub fn login(
		remote_id: u64,
		email: &str,
		token: &str,
		expires_at: Option<OffsetDateTime>,
	) -> Self {
		Self::Ok(AuthResult {
			user: Some(RemoteUser { id: remote_id, email: email.into(), name: "Ada".into() }),
			token: Some(token.into()),
			expires_at,
		})
	}

	pub fn token(token: &str, expires_at: Option<OffsetDateTime>) -> Self {
		Self::Ok(AuthResult { user: None, token: Some(token.into()), expires_at })
	}

	fn into_result(self, endpoint: Endpoint) -> Result<AuthResult> {
		match self {
			Self::Ok(result) => Ok(result),
			Self::Reject(status) => {
				let message = "Scripted rejection.".into();

				Err(AuthorityError::Rejected { endpoint, status, message }.into())
			},
			Self::Unreachable => Err(TransportError::Timeout { endpoint }.into()),
		}
	}
}

/// In-process authority answering from per-endpoint scripts.
///
/// Queued replies are consumed first; afterwards the endpoint's fallback answers, and an
/// endpoint without one rejects with 401.
#[derive(Debug, Default)]
pub struct StubAuthority {
	queued: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
	fallbacks: Mutex<HashMap<Endpoint, Reply>>,
	calls: Mutex<Vec<(Endpoint, String)>>,
	delay: Mutex<Option<std::time::Duration>>,
}
impl StubAuthority {
	/// Queues a one-shot reply.
	pub fn then(&self, endpoint: Endpoint, reply: Reply) -> &Self {
		self.queued.lock().entry(endpoint).or_default().push_back(reply);

		self
	}

	/// Sets the reply used once the queue of `endpoint` is empty.
	pub fn always(&self, endpoint: Endpoint, reply: Reply) -> &Self {
		self.fallbacks.lock().insert(endpoint, reply);

		self
	}

	/// Delays every reply, keeping concurrent callers in flight.
	pub fn delay_replies(&self, delay: std::time::Duration) {
		*self.delay.lock() = Some(delay);
	}

	/// Number of calls received by `endpoint`.
	pub fn calls(&self, endpoint: Endpoint) -> usize {
		self.calls.lock().iter().filter(|(called, _)| *called == endpoint).count()
	}

	/// Subjects (email or token) sent to `endpoint`, in call order.
	pub fn subjects(&self, endpoint: Endpoint) -> Vec<String> {
		self.calls
			.lock()
			.iter()
			.filter(|(called, _)| *called == endpoint)
			.map(|(_, subject)| subject.clone())
			.collect()
	}

	fn next_reply(&self, endpoint: Endpoint, subject: &str) -> Reply {
		self.calls.lock().push((endpoint, subject.to_owned()));

		if let Some(reply) = self.queued.lock().get_mut(&endpoint).and_then(VecDeque::pop_front) {
			return reply;
		}

		self.fallbacks.lock().get(&endpoint).cloned().unwrap_or(Reply::Reject(401))
	}

	async fn answer(&self, endpoint: Endpoint, subject: &str) -> Result<AuthResult> {
		let reply = self.next_reply(endpoint, subject);
		let delay = *self.delay.lock();

		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}

		reply.into_result(endpoint)
	}
}
impl RemoteAuthClient for StubAuthority {
	fn login<'a>(&'a self, email: &'a str, _password: &'a str) -> RemoteFuture<'a, AuthResult> {
		Box::pin(self.answer(Endpoint::Login, email))
	}

	fn validate_token<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, AuthResult> {
		Box::pin(self.answer(Endpoint::Validate, token.expose()))
	}

	fn refresh_token<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, AuthResult> {
		Box::pin(self.answer(Endpoint::Refresh, token.expose()))
	}

	fn logout<'a>(&'a self, token: &'a TokenSecret) -> RemoteFuture<'a, bool> {
		Box::pin(async move {
			match self.answer(Endpoint::Logout, token.expose()).await {
				Ok(_) => Ok(true),
				Err(Error::Authority(AuthorityError::Rejected { .. })) => Ok(false),
				Err(e) => Err(e),
			}
		})
	}
}

/// Orchestrator wired to the stub authority, in-memory stores, and a manual clock.
pub struct Harness {
	pub authority: Arc<StubAuthority>,
	pub users: MemoryUserStore,
	pub cache: MemoryCache,
	pub clock: ManualClock,
	pub orchestrator: Arc<AuthOrchestrator>,
}
impl Harness {
	pub fn new() -> Self {
		Self::with_config(|config| config)
	}

	pub fn with_config(tweak: impl FnOnce(SsoConfig) -> SsoConfig) -> Self {
		let clock = ManualClock::new(NOW);
		let authority = Arc::new(StubAuthority::default());
		let users = MemoryUserStore::default();
		let cache = MemoryCache::new(Arc::new(clock.clone()));
		let orchestrator = AuthOrchestrator::new(
			tweak(config()),
			authority.clone(),
			Arc::new(users.clone()),
			Arc::new(cache.clone()),
		)
		.with_clock(Arc::new(clock.clone()));

		Self { authority, users, cache, clock, orchestrator: Arc::new(orchestrator) }
	}

	/// Stores a user holding `token` (or no token) that expires at `expires_at`.
	pub async fn seed(
		&self,
		email: &str,
		token: Option<&str>,
		expires_at: Option<OffsetDateTime>,
	) -> User {
		self.users
			.upsert_by_email(UserUpsert {
				email: email.into(),
				name: "Seeded".into(),
				remote_id: Some(1),
				token: token.map(|token| StoredToken::new(token, expires_at)),
				last_login_at: None,
			})
			.await
			.expect("Seeding a user should succeed.")
	}

	/// Stores a user holding `token` valid for one more hour.
	pub async fn seed_live(&self, email: &str, token: &str) -> User {
		self.seed(email, Some(token), Some(NOW + Duration::hours(1))).await
	}

	/// Current stored copy of `user`.
	pub async fn reload(&self, user: &User) -> User {
		self.users
			.find_by_id(user.id)
			.await
			.expect("User lookup should succeed.")
			.expect("Seeded user should still exist.")
	}
}

/// Base configuration used by every harness.
pub fn config() -> SsoConfig {
	SsoConfig::new(
		Url::parse("https://sso.example.com").expect("Fixture URL should parse."),
		AppSlug::new("billing").expect("Fixture slug should be valid."),
	)
	.with_secret_key("test-key")
}

pub fn guard_name(name: &str) -> GuardName {
	GuardName::new(name).expect("Fixture guard name should be valid.")
}
