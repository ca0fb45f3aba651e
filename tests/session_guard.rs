mod common;

// std
use std::sync::Arc;
// crates.io
use time::Duration;
// self
use common::{Harness, NOW, Reply, guard_name};
use sso_client::{
	auth::{TokenSecret, User},
	guard::{Credentials, Guard, SessionGuard},
	http::Endpoint,
	locator::{COOKIE_NAME, QUERY_PARAM, SESSION_KEY},
	request::{AuthRequest, RequestContext, Resolution},
	store::{MemorySessionStore, SessionStore},
};

fn session_guard(h: &Harness) -> SessionGuard {
	SessionGuard::new(guard_name("sso"), h.orchestrator.clone())
}

fn context(request: AuthRequest, session: &MemorySessionStore) -> RequestContext {
	RequestContext::new(request, Arc::new(session.clone()))
}

fn token_of(user: &User) -> Option<&str> {
	user.token_secret().map(TokenSecret::expose)
}

#[tokio::test]
async fn bearer_requests_resolve_once_per_request() {
	let h = Harness::new();
	let seeded = h.seed_live("ada@example.com", "abc").await;
	let guard = session_guard(&h);
	let ctx = RequestContext::stateless(AuthRequest::new().with_bearer("abc"));

	h.authority.always(Endpoint::Validate, Reply::accept());

	assert_eq!(guard.user(&ctx).await.map(|user| user.id), Some(seeded.id));
	assert!(guard.check(&ctx).await);
	assert!(!guard.guest(&ctx).await);
	assert_eq!(guard.id(&ctx).await, Some(seeded.id));
	assert!(guard.has_user(&ctx));
	assert_eq!(h.authority.calls(Endpoint::Validate), 1);

	// A fresh request for the same token hits the validation cache.
	let next = RequestContext::stateless(AuthRequest::new().with_bearer("abc"));

	assert!(guard.check(&next).await);
	assert_eq!(h.authority.calls(Endpoint::Validate), 1);
}

#[tokio::test]
async fn header_wins_over_the_session() {
	let h = Harness::new();
	let ada = h.seed_live("ada@example.com", "abc").await;
	let _bob = h.seed_live("bob@example.com", "def").await;
	let session = MemorySessionStore::default();

	session.put(SESSION_KEY, "def".into());
	h.authority.always(Endpoint::Validate, Reply::accept());

	let ctx = context(AuthRequest::new().with_bearer("abc"), &session);

	assert_eq!(session_guard(&h).id(&ctx).await, Some(ada.id));
	assert_eq!(h.authority.subjects(Endpoint::Validate), ["abc"]);
}

#[tokio::test]
async fn session_and_cookie_tokens_resolve() {
	let h = Harness::new();
	let ada = h.seed_live("ada@example.com", "abc").await;
	let bob = h.seed_live("bob@example.com", "def").await;
	let guard = session_guard(&h);
	let session = MemorySessionStore::default();

	session.put(SESSION_KEY, "abc".into());
	h.authority.always(Endpoint::Validate, Reply::accept());

	let from_session = context(AuthRequest::new(), &session);
	let from_cookie = RequestContext::stateless(AuthRequest::new().with_cookie(COOKIE_NAME, "def"));

	assert_eq!(guard.id(&from_session).await, Some(ada.id));
	assert_eq!(guard.id(&from_cookie).await, Some(bob.id));
	assert!(guard.via_remember(&from_cookie).await);
	assert!(!guard.via_remember(&from_session).await);
}

#[tokio::test]
async fn query_tokens_require_opt_in() {
	let closed = Harness::new();
	let open = Harness::with_config(|config| config.with_allow_query_token(true));

	for h in [&closed, &open] {
		h.seed_live("ada@example.com", "abc").await;
		h.authority.always(Endpoint::Validate, Reply::accept());
	}

	let request = AuthRequest::new().with_query(QUERY_PARAM, "abc");

	assert!(session_guard(&closed).guest(&RequestContext::stateless(request.clone())).await);
	assert!(session_guard(&open).check(&RequestContext::stateless(request)).await);
	assert_eq!(closed.authority.calls(Endpoint::Validate), 0);
}

#[tokio::test]
async fn unknown_tokens_are_denied_without_remote_calls() {
	let h = Harness::new();
	let guard = session_guard(&h);
	let ctx = RequestContext::stateless(AuthRequest::new().with_bearer("nope"));

	assert!(guard.user(&ctx).await.is_none());
	assert_eq!(ctx.resolution(&guard_name("sso")), Resolution::Denied);
	assert!(guard.user(&ctx).await.is_none());
	assert_eq!(h.authority.calls(Endpoint::Validate), 0);
	assert_eq!(h.authority.calls(Endpoint::Refresh), 0);
}

#[tokio::test]
async fn expired_tokens_are_refreshed_before_validation() {
	let h = Harness::new();
	let seeded = h.seed("ada@example.com", Some("abc"), Some(NOW - Duration::minutes(1))).await;
	let session = MemorySessionStore::default();

	session.put(SESSION_KEY, "abc".into());
	h.authority
		.then(Endpoint::Refresh, Reply::token("xyz", Some(NOW + Duration::hours(1))))
		.always(Endpoint::Validate, Reply::accept());

	let ctx = context(AuthRequest::new(), &session);
	let user = session_guard(&h).user(&ctx).await.expect("Refreshed user should resolve.");

	assert_eq!(user.id, seeded.id);
	assert_eq!(token_of(&user), Some("xyz"));
	assert_eq!(session.get(SESSION_KEY), Some("xyz".into()));
	assert_eq!(h.authority.subjects(Endpoint::Validate), ["xyz"]);
}

#[tokio::test]
async fn failed_refresh_of_an_expired_token_denies_and_keeps_state() {
	let h = Harness::new();
	let seeded = h.seed("ada@example.com", Some("abc"), Some(NOW - Duration::minutes(1))).await;
	let session = MemorySessionStore::default();

	session.put(SESSION_KEY, "abc".into());
	h.authority.then(Endpoint::Refresh, Reply::Reject(401));

	let ctx = context(AuthRequest::new(), &session);

	assert!(session_guard(&h).user(&ctx).await.is_none());
	assert_eq!(h.authority.calls(Endpoint::Validate), 0);
	assert_eq!(h.reload(&seeded).await, seeded);
	assert_eq!(session.get(SESSION_KEY), Some("abc".into()));
}

#[tokio::test]
async fn rejected_tokens_get_one_refresh() {
	let h = Harness::new();
	let seeded = h.seed_live("ada@example.com", "abc").await;

	h.authority
		.then(Endpoint::Validate, Reply::Reject(401))
		.then(Endpoint::Refresh, Reply::token("xyz", None));

	let ctx = RequestContext::stateless(AuthRequest::new().with_bearer("abc"));
	let user = session_guard(&h).user(&ctx).await.expect("Refreshed user should resolve.");

	assert_eq!(user.id, seeded.id);
	assert_eq!(token_of(&user), Some("xyz"));
	assert_eq!(h.authority.calls(Endpoint::Refresh), 1);

	// Rejected again and the refresh fails: denied.
	let stale = RequestContext::stateless(AuthRequest::new().with_bearer("xyz"));

	h.authority
		.then(Endpoint::Validate, Reply::Reject(401))
		.then(Endpoint::Refresh, Reply::Reject(401));

	assert!(session_guard(&h).user(&stale).await.is_none());
}

#[tokio::test]
async fn attempt_logs_in_and_queues_the_remember_cookie() {
	let h = Harness::new();
	let guard = session_guard(&h);
	let session = MemorySessionStore::default();
	let ctx = context(AuthRequest::new(), &session);

	h.authority.then(Endpoint::Login, Reply::login(7, "ada@example.com", "abc", None));

	assert!(!guard.attempt(&ctx, &Credentials::new("ada@example.com", ""), true).await);
	assert!(guard.attempt(&ctx, &Credentials::new("ada@example.com", "hunter2"), true).await);
	assert_eq!(h.authority.calls(Endpoint::Login), 1);
	assert_eq!(session.get(SESSION_KEY), Some("abc".into()));
	assert!(guard.has_user(&ctx));

	let cookie = ctx.cookies().get(COOKIE_NAME).expect("Remember cookie should be queued.");

	assert_eq!(cookie.value, Some("abc".into()));
	assert_eq!(cookie.max_age, Duration::days(30));
}

#[tokio::test]
async fn failed_attempts_leave_the_request_unauthenticated() {
	let h = Harness::new();
	let guard = session_guard(&h);
	let session = MemorySessionStore::default();
	let ctx = context(AuthRequest::new(), &session);

	h.authority.then(Endpoint::Login, Reply::Reject(401));

	assert!(!guard.attempt(&ctx, &Credentials::new("ada@example.com", "wrong"), true).await);
	assert!(session.get(SESSION_KEY).is_none());
	assert!(ctx.cookies().queued().is_empty());
	assert!(!guard.has_user(&ctx));
}

#[tokio::test]
async fn once_authenticates_without_touching_the_session() {
	let h = Harness::new();
	let guard = session_guard(&h);
	let session = MemorySessionStore::default();
	let ctx = context(AuthRequest::new(), &session);

	h.authority.then(Endpoint::Login, Reply::login(7, "ada@example.com", "abc", None));

	assert!(guard.once(&ctx, &Credentials::new("ada@example.com", "hunter2")).await);
	assert!(guard.has_user(&ctx));
	assert!(session.get(SESSION_KEY).is_none());
	assert!(ctx.cookies().queued().is_empty());
}

#[tokio::test]
async fn login_by_id_requires_a_token() {
	let h = Harness::new();
	let guard = session_guard(&h);
	let holder = h.seed_live("ada@example.com", "abc").await;
	let tokenless = h.seed("bob@example.com", None, None).await;
	let session = MemorySessionStore::default();
	let ctx = context(AuthRequest::new(), &session);

	assert!(guard.login_using_id(&ctx, tokenless.id, false).await.is_none());
	assert!(guard.once_using_id(&ctx, tokenless.id).await.is_none());

	let logged_in = guard.login_using_id(&ctx, holder.id, false).await;

	assert_eq!(logged_in.map(|user| user.id), Some(holder.id));
	assert_eq!(session.get(SESSION_KEY), Some("abc".into()));
	assert!(ctx.cookies().get(COOKIE_NAME).is_none());
}

#[tokio::test]
async fn logout_clears_session_cookie_and_stored_token() {
	let h = Harness::new();
	let seeded = h.seed_live("ada@example.com", "abc").await;
	let guard = session_guard(&h);
	let session = MemorySessionStore::default();

	session.put(SESSION_KEY, "abc".into());
	h.authority
		.always(Endpoint::Validate, Reply::accept())
		.always(Endpoint::Logout, Reply::accept());

	let ctx = context(AuthRequest::new(), &session);

	assert!(guard.check(&ctx).await);

	guard.logout(&ctx).await;

	assert!(session.get(SESSION_KEY).is_none());
	assert!(ctx.cookies().get(COOKIE_NAME).is_some_and(|cookie| cookie.is_expiry()));
	assert!(h.reload(&seeded).await.token.is_none());
	assert_eq!(h.authority.subjects(Endpoint::Logout), ["abc"]);
	assert!(guard.guest(&ctx).await);
}

#[tokio::test]
async fn logout_of_a_guest_still_clears_the_request() {
	let h = Harness::new();
	let guard = session_guard(&h);
	let session = MemorySessionStore::default();

	session.put(SESSION_KEY, "unknown".into());

	let ctx = context(AuthRequest::new(), &session);

	guard.logout(&ctx).await;

	assert!(session.get(SESSION_KEY).is_none());
	assert!(ctx.cookies().get(COOKIE_NAME).is_some_and(|cookie| cookie.is_expiry()));
	assert_eq!(h.authority.calls(Endpoint::Logout), 0);
}

#[tokio::test]
async fn logout_revokes_an_expired_token_without_resolving() {
	let h = Harness::new();
	let seeded = h.seed("ada@example.com", Some("abc"), Some(NOW - Duration::minutes(1))).await;
	let guard = session_guard(&h);
	let ctx = RequestContext::stateless(AuthRequest::new().with_bearer("abc"));

	h.authority
		.always(Endpoint::Refresh, Reply::token("xyz", Some(NOW + Duration::hours(1))))
		.always(Endpoint::Validate, Reply::accept())
		.always(Endpoint::Logout, Reply::accept());
	guard.logout(&ctx).await;

	assert_eq!(h.authority.calls(Endpoint::Refresh), 0);
	assert_eq!(h.authority.calls(Endpoint::Validate), 0);
	assert_eq!(h.authority.subjects(Endpoint::Logout), ["abc"]);
	assert!(h.reload(&seeded).await.token.is_none());
	assert!(guard.guest(&ctx).await);
}

#[tokio::test]
async fn status_reflects_the_resolved_user() {
	let h = Harness::new();
	let guard = session_guard(&h);

	h.seed("ada@example.com", Some("abc"), Some(NOW + Duration::minutes(5))).await;
	h.authority.always(Endpoint::Validate, Reply::accept());

	let ctx = RequestContext::stateless(AuthRequest::new().with_bearer("abc"));
	let status = guard.status(&ctx).await;

	assert!(status.is_authenticated);
	assert!(status.has_valid_token);
	assert!(status.needs_refresh);
	assert!(!guard.status(&RequestContext::stateless(AuthRequest::new())).await.is_authenticated);
}
