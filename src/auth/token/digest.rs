//! One-way token digests used as cache keys.
//!
//! A digest is the base64url (unpadded) SHA-256 of the length-prefixed secret key followed by
//! the token. Digests may appear in cache keys and logs; raw tokens may not.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Non-reversible fingerprint of a bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenDigest(String);
impl TokenDigest {
	/// Returns the encoded digest.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for TokenDigest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Computes [`TokenDigest`]s, optionally keyed with the application's secret key.
#[derive(Clone, Default)]
pub struct TokenDigester {
	key: Option<TokenSecret>,
}
impl TokenDigester {
	/// Creates a digester keyed with `key`; `None` produces plain SHA-256 digests.
	pub fn new(key: Option<TokenSecret>) -> Self {
		Self { key }
	}

	/// Digests `token`.
	pub fn digest(&self, token: &TokenSecret) -> TokenDigest {
		let mut hasher = Sha256::new();

		if let Some(key) = &self.key {
			let key = key.expose().as_bytes();

			hasher.update((key.len() as u64).to_be_bytes());
			hasher.update(key);
		}

		hasher.update(token.expose().as_bytes());

		TokenDigest(URL_SAFE_NO_PAD.encode(hasher.finalize()))
	}
}
impl Debug for TokenDigester {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenDigester").field("keyed", &self.key.is_some()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn digest_is_stable_and_hides_the_token() {
		let digester = TokenDigester::default();
		let token = TokenSecret::new("abc");
		let digest = digester.digest(&token);

		assert_eq!(digest, digester.digest(&TokenSecret::new("abc")));
		assert_ne!(digest, digester.digest(&TokenSecret::new("xyz")));
		assert!(!digest.as_str().contains("abc"));
		// SHA-256 is 32 bytes, 43 characters in unpadded base64.
		assert_eq!(digest.as_str().len(), 43);
	}

	#[test]
	fn keyed_digests_differ_per_key() {
		let token = TokenSecret::new("abc");
		let plain = TokenDigester::default().digest(&token);
		let keyed_a = TokenDigester::new(Some("key-a".into())).digest(&token);
		let keyed_b = TokenDigester::new(Some("key-b".into())).digest(&token);

		assert_ne!(plain, keyed_a);
		assert_ne!(keyed_a, keyed_b);
		assert_eq!(
			format!("{:?}", TokenDigester::new(Some("key-a".into()))),
			"TokenDigester { keyed: true }"
		);
	}
}
