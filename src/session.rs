//! Cookie-backed session identity.
//!
//! Identities are carried only inside signed cookies: `session_user_id` for the native user and
//! `secondary_user_id` for an optional second account linked from another provider. Each cookie
//! is signed under its own namespace of the master [`SigningKey`](crate::security::SigningKey),
//! so a value lifted from one cookie never verifies as another.

pub mod cookies;
pub mod jar;
pub mod policy;

mod resolver;

pub use cookies::*;
pub use policy::*;
