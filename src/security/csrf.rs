//! Double-submit-cookie CSRF guard.

// crates.io
use ::http::{HeaderMap, HeaderName, Method};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use cookie::Cookie;
use rand::Rng;
use subtle::ConstantTimeEq;
// self
use crate::session::{CookiePolicy, jar};

/// Default name of the cookie holding the CSRF token.
pub const CSRF_COOKIE_NAME: &str = "csrf_token";
/// Default header clients echo the CSRF token in.
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

const CSRF_TOKEN_BYTES: usize = 32;

/// Compares the CSRF cookie against the client-echoed header on state-changing requests.
#[derive(Clone, Debug)]
pub struct CsrfGuard {
	cookie_name: String,
	header_name: HeaderName,
}
impl CsrfGuard {
	/// Creates a guard reading `cookie_name` and `header_name`.
	pub fn new(cookie_name: impl Into<String>, header_name: HeaderName) -> Self {
		Self { cookie_name: cookie_name.into(), header_name }
	}

	/// Name of the cookie the guard reads.
	pub fn cookie_name(&self) -> &str {
		&self.cookie_name
	}

	/// Name of the header the guard reads.
	pub fn header_name(&self) -> &HeaderName {
		&self.header_name
	}

	/// Returns `true` for methods that must not change state and so skip the check.
	pub fn is_safe_method(method: &Method) -> bool {
		matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
	}

	/// Accepts safe methods unconditionally; otherwise requires matching cookie and header.
	pub fn check(&self, method: &Method, headers: &HeaderMap) -> bool {
		Self::is_safe_method(method) || self.tokens_match(headers)
	}

	/// Returns `true` only if both tokens are present, non-empty, and equal.
	pub fn tokens_match(&self, headers: &HeaderMap) -> bool {
		let Some(cookie_token) = jar::cookie_value(headers, &self.cookie_name) else {
			return false;
		};
		let Some(header_token) =
			headers.get(&self.header_name).and_then(|value| value.to_str().ok())
		else {
			return false;
		};

		if cookie_token.is_empty() || header_token.is_empty() {
			return false;
		}

		cookie_token.as_bytes().ct_eq(header_token.as_bytes()).into()
	}

	/// Issues a fresh token in a cookie readable by client script.
	pub fn issue(&self, policy: &CookiePolicy) -> Cookie<'static> {
		policy.build(&self.cookie_name, generate_token(), false)
	}
}
impl Default for CsrfGuard {
	fn default() -> Self {
		Self::new(CSRF_COOKIE_NAME, HeaderName::from_static(CSRF_HEADER_NAME))
	}
}

/// Generates a random 256-bit token encoded as base64url.
pub fn generate_token() -> String {
	let mut bytes = [0_u8; CSRF_TOKEN_BYTES];

	rand::rng().fill(&mut bytes);

	URL_SAFE_NO_PAD.encode(bytes)
}
