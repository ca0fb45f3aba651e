//! Bearer-token SSO client core: resolve requests to users, mirror tokens locally, validate
//! against the authority behind a TTL cache, and refresh transparently.
//!
//! The moving parts, leaves first:
//!
//! - [`locator::TokenLocator`] finds a bearer token on a request (header, session, cookie, query).
//! - [`cache::ValidationCache`] memoizes "is this token valid" keyed by a token digest.
//! - [`flows::AuthOrchestrator`] logs in, validates, refreshes, and logs out against the
//!   [`http::RemoteAuthClient`].
//! - [`guard::SessionGuard`] resolves a [`request::RequestContext`] to a user at most once.
//! - [`boundary::AuthBoundary`] protects routes with named guards.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod boundary;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod flows;
pub mod guard;
pub mod http;
pub mod locator;
pub mod obs;
pub mod request;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
