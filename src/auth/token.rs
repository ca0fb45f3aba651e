//! Bearer token secrets and their one-way digests.

pub mod digest;
pub mod secret;
