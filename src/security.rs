//! Integrity primitives for client-held state.
//!
//! `signed` attaches HMAC-SHA256 tags to cookie payloads so the service can trust values it
//! handed out without keeping server-side session rows. `csrf` implements the double-submit
//! cookie check that guards state-changing requests.

pub mod csrf;
pub mod signed;

pub use csrf::*;
pub use signed::*;
