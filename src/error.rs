//! Crate-level error types shared by the transport, stores, and configuration.
//!
//! Nothing in this module crosses the guard/orchestrator boundary: those layers log the
//! error and degrade to `bool`/`Option` results.

// self
use crate::{_prelude::*, http::Endpoint};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error produced by collaborators (transport, stores, configuration).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The SSO authority answered but refused or garbled the call.
	#[error(transparent)]
	Authority(#[from] AuthorityError),
}
impl Error {
	/// Returns `true` when the authority could not be reached at all.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Transport(_))
	}

	/// Returns `true` when repeating the same call may succeed.
	///
	/// Transport failures, 5xx responses, and `429 Too Many Requests` are retryable;
	/// any other authority answer is final.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Transport(_) => true,
			Self::Authority(AuthorityError::Rejected { status, .. }) =>
				*status >= 500 || *status == 429,
			_ => false,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// The authority URL cannot be parsed.
	#[error("Auth server URL is invalid.")]
	InvalidServerUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The authority URL cannot carry the `/api/sso/*` path segments.
	#[error("Auth server URL `{url}` must be an http(s) base URL.")]
	UnsupportedServerUrl {
		/// Offending URL.
		url: String,
	},
	/// An identifier (app slug, guard name) failed validation.
	#[error(transparent)]
	Identifier(#[from] crate::auth::IdentifierError),
	/// A numeric setting is outside its permitted range.
	#[error("Setting `{field}` must be at least {min}.")]
	OutOfRange {
		/// Setting name.
		field: &'static str,
		/// Smallest accepted value.
		min: u64,
	},
	/// A required environment variable is not set.
	#[error("Environment variable `{var}` is required.")]
	MissingVar {
		/// Variable name.
		var: &'static str,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{var}` holds an invalid value: {value}.")]
	InvalidVar {
		/// Variable name.
		var: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the SSO authority.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The call did not finish within the configured timeout.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint being called.
		endpoint: Endpoint,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the SSO authority.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}

/// Failures reported by the SSO authority itself.
#[derive(Debug, ThisError)]
pub enum AuthorityError {
	/// Non-success HTTP status.
	#[error("The {endpoint} endpoint rejected the call with status {status}: {message}.")]
	Rejected {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// HTTP status code.
		status: u16,
		/// Authority-supplied message or a body preview.
		message: String,
	},
	/// Success status but a body that does not match the wire contract.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	MalformedResponse {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// HTTP status code.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Success status but a required field was absent.
	#[error("The {endpoint} endpoint response is missing `{field}`.")]
	IncompleteResponse {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Missing field.
		field: &'static str,
	},
}
