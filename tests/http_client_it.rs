#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::macros;
// self
use sso_client::{
	auth::{AppSlug, RemoteUser, TokenSecret},
	config::SsoConfig,
	error::{AuthorityError, Error, TransportError},
	http::{Endpoint, RemoteAuthClient, ReqwestAuthClient},
	url::Url,
};

fn client<F>(server: &MockServer, configure: F) -> ReqwestAuthClient
where
	F: FnOnce(SsoConfig) -> SsoConfig,
{
	let config = SsoConfig::new(
		Url::parse(&server.base_url()).expect("Mock server URL should parse."),
		AppSlug::new("billing").expect("Fixture slug should be valid."),
	)
	.with_retry(3, 1);

	ReqwestAuthClient::new(&configure(config)).expect("Client should build for the mock server.")
}

#[tokio::test]
async fn login_posts_credentials_and_decodes_the_identity() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/login").json_body(json!({
				"email": "ada@example.com",
				"password": "hunter2",
				"app_slug": "billing",
			}));
			then.status(200).json_body(json!({
				"user": { "id": 7, "email": "ada@example.com", "name": "Ada" },
				"token": "abc",
				"expires_at": "2025-01-01T13:00:00Z",
			}));
		})
		.await;
	let result = client(&server, |config| config)
		.login("ada@example.com", "hunter2")
		.await
		.expect("Login should succeed.");

	mock.assert_async().await;

	assert_eq!(
		result.user,
		Some(RemoteUser { id: 7, email: "ada@example.com".into(), name: "Ada".into() })
	);
	assert_eq!(result.token, Some(TokenSecret::new("abc")));
	assert_eq!(result.expires_at, Some(macros::datetime!(2025-01-01 13:00 UTC)));
}

#[tokio::test]
async fn token_calls_send_the_bearer_and_app_slug() {
	let server = MockServer::start_async().await;
	let validate = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/sso/validate")
				.header("authorization", "Bearer abc")
				.json_body(json!({ "app_slug": "billing" }));
			then.status(200).json_body(json!({ "valid": true }));
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/sso/refresh")
				.header("authorization", "Bearer abc")
				.json_body(json!({ "app_slug": "billing" }));
			then.status(200).json_body(json!({ "token": "xyz", "expires_at": null }));
		})
		.await;
	let client = client(&server, |config| config);
	let token = TokenSecret::new("abc");

	client.validate_token(&token).await.expect("Validation should succeed.");

	let refreshed = client.refresh_token(&token).await.expect("Refresh should succeed.");

	validate.assert_async().await;
	refresh.assert_async().await;

	assert_eq!(refreshed.token, Some(TokenSecret::new("xyz")));
	assert!(refreshed.expires_at.is_none());
}

#[tokio::test]
async fn server_errors_are_retried_until_attempts_run_out() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/validate");
			then.status(503).body("Service Unavailable");
		})
		.await;
	let err = client(&server, |config| config)
		.validate_token(&TokenSecret::new("abc"))
		.await
		.expect_err("A persistent 503 should surface.");

	mock.assert_calls_async(3).await;

	assert!(err.is_retryable());
	assert!(matches!(
		err,
		Error::Authority(AuthorityError::Rejected { endpoint: Endpoint::Validate, status: 503, .. })
	));
}

#[tokio::test]
async fn client_errors_are_final_and_carry_the_message() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/refresh");
			then.status(401).json_body(json!({ "message": "Token revoked" }));
		})
		.await;
	let err = client(&server, |config| config)
		.refresh_token(&TokenSecret::new("abc"))
		.await
		.expect_err("A 401 should surface.");

	mock.assert_calls_async(1).await;

	match err {
		Error::Authority(AuthorityError::Rejected { endpoint, status, message }) => {
			assert_eq!(endpoint, Endpoint::Refresh);
			assert_eq!(status, 401);
			assert_eq!(message, "Token revoked");
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn malformed_success_bodies_are_reported() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/login");
			then.status(200).body("<html>maintenance</html>");
		})
		.await;

	let err = client(&server, |config| config)
		.login("ada@example.com", "hunter2")
		.await
		.expect_err("A non-JSON body should fail to decode.");

	assert!(matches!(
		err,
		Error::Authority(AuthorityError::MalformedResponse { endpoint: Endpoint::Login, .. })
	));
	assert!(!err.is_retryable());
}

#[tokio::test]
async fn logout_reports_refusals_as_false() {
	let server = MockServer::start_async().await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/logout").header("authorization", "Bearer abc");
			then.status(200).json_body(json!({ "message": "Logged out" }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/logout").header("authorization", "Bearer gone");
			then.status(401).json_body(json!({ "message": "Unknown token" }));
		})
		.await;

	let client = client(&server, |config| config);

	assert!(client.logout(&TokenSecret::new("abc")).await.expect("Logout should answer."));
	assert!(!client.logout(&TokenSecret::new("gone")).await.expect("Refusal is not an error."));

	accepted.assert_async().await;
}

#[tokio::test]
async fn slow_authorities_time_out_as_transport_errors() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/sso/validate");
			then.status(200).delay(std::time::Duration::from_secs(3));
		})
		.await;

	let err = client(&server, |config| config.with_timeout(1).with_retry(1, 0))
		.validate_token(&TokenSecret::new("abc"))
		.await
		.expect_err("The call should time out.");

	assert!(err.is_transport());
	assert!(matches!(
		err,
		Error::Transport(TransportError::Timeout { endpoint: Endpoint::Validate })
	));
}
