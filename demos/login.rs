//! Demonstrates a full request lifecycle against a mocked SSO authority: credential login,
//! bearer resolution through the route boundary, and logout.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use sso_client::{
	auth::{AppSlug, GuardName},
	boundary::AuthBoundary,
	cache::MemoryCache,
	config::SsoConfig,
	flows::AuthOrchestrator,
	guard::{Credentials, Guard, GuardRegistry, SessionGuard},
	request::{AuthRequest, RequestContext},
	store::{MemorySessionStore, MemoryUserStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/login");
			then.status(200).json_body(json!({
				"user": { "id": 42, "email": "ada@example.com", "name": "Ada" },
				"token": "demo-token",
				"expires_at": null,
			}));
		})
		.await;
	let validate_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/sso/validate")
				.header("authorization", "Bearer demo-token");
			then.status(200).json_body(json!({ "valid": true }));
		})
		.await;
	let logout_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/logout");
			then.status(200).json_body(json!({ "message": "Logged out" }));
		})
		.await;
	let config = SsoConfig::new(Url::parse(&server.base_url())?, AppSlug::new("demo-app")?)
		.with_secret_key("demo-secret");
	let orchestrator = Arc::new(AuthOrchestrator::with_reqwest(
		config,
		Arc::new(MemoryUserStore::default()),
		Arc::new(MemoryCache::default()),
	)?);
	let guard = Arc::new(SessionGuard::new(GuardName::new("sso")?, orchestrator.clone()));
	let boundary =
		AuthBoundary::new(GuardRegistry::new().with_guard(guard.clone()), orchestrator.clone());

	// Browser login: the token lands in the session and the remember-me cookie.
	let session = MemorySessionStore::default();
	let login_ctx = RequestContext::new(AuthRequest::new(), Arc::new(session.clone()));
	let credentials = Credentials::new("ada@example.com", "correct horse");

	if !guard.attempt(&login_ctx, &credentials, true).await {
		return Err(eyre!("Login was rejected."));
	}

	println!("Queued cookies: {:?}.", login_ctx.cookies().queued());

	// API request carrying the bearer token.
	let api_ctx = RequestContext::stateless(
		AuthRequest::new().with_bearer("demo-token").with_header("Accept", "application/json"),
	);
	let outcome = boundary.authenticate(&api_ctx, &[]).await;
	let user = outcome.user().ok_or_else(|| eyre!("Bearer request was not authenticated."))?;

	println!("Authenticated {} ({}).", user.name, user.email);
	println!("Status: {}.", serde_json::to_string(&guard.status(&api_ctx).await)?);

	// Logout from the browser session.
	let logout_ctx = RequestContext::new(AuthRequest::new(), Arc::new(session));

	guard.logout(&logout_ctx).await;

	println!("Logged out; guest: {}.", guard.guest(&logout_ctx).await);

	login_mock.assert_async().await;
	validate_mock.assert_async().await;
	logout_mock.assert_async().await;

	Ok(())
}
