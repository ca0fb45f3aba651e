//! Auth-domain identifiers, user records, token secrets, and remote call results.

pub mod id;
pub mod result;
pub mod token;
pub mod user;

pub use id::*;
pub use result::*;
pub use token::{digest::*, secret::*};
pub use user::*;
