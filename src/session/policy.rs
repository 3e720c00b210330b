//! Cookie attribute policy and cookie names.

// crates.io
use cookie::{Cookie, SameSite};
// self
use crate::{_prelude::*, security::CSRF_COOKIE_NAME};

/// Default name of the native session cookie.
pub const SESSION_COOKIE_NAME: &str = "session_user_id";
/// Default name of the secondary identity cookie.
pub const SECONDARY_COOKIE_NAME: &str = "secondary_user_id";
/// Default name of the signed OAuth token cookie.
pub const TOKEN_COOKIE_NAME: &str = "oauth_token";

/// Attributes applied to every cookie the broker issues.
///
/// `SameSite=Lax` is fixed. `HttpOnly` is chosen per cookie: only the CSRF cookie is left
/// readable by client script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookiePolicy {
	secure: bool,
	path: String,
	domain: Option<String>,
	max_age: Option<Duration>,
}
impl CookiePolicy {
	/// Sets the `Secure` attribute; disable only for plain-HTTP development setups.
	pub fn with_secure(mut self, secure: bool) -> Self {
		self.secure = secure;

		self
	}

	/// Overrides the `Path` attribute.
	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();

		self
	}

	/// Sets the `Domain` attribute.
	pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());

		self
	}

	/// Sets `Max-Age`; without it cookies last for the browser session.
	pub fn with_max_age(mut self, max_age: Duration) -> Self {
		self.max_age = Some(max_age);

		self
	}

	/// Whether cookies carry `Secure`.
	pub fn secure(&self) -> bool {
		self.secure
	}

	/// Configured cookie path.
	pub fn path(&self) -> &str {
		&self.path
	}

	pub(crate) fn build(&self, name: &str, value: String, http_only: bool) -> Cookie<'static> {
		let mut cookie = Cookie::build((name.to_owned(), value))
			.path(self.path.clone())
			.http_only(http_only)
			.secure(self.secure)
			.same_site(SameSite::Lax)
			.build();

		if let Some(domain) = &self.domain {
			cookie.set_domain(domain.clone());
		}
		if let Some(max_age) = self.max_age {
			cookie.set_max_age(max_age);
		}

		cookie
	}

	pub(crate) fn expired(&self, name: &str, http_only: bool) -> Cookie<'static> {
		let mut cookie = self.build(name, String::new(), http_only);

		cookie.make_removal();

		cookie
	}
}
impl Default for CookiePolicy {
	fn default() -> Self {
		Self { secure: true, path: "/".into(), domain: None, max_age: None }
	}
}

/// Names of the cookies the broker reads and writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CookieNames {
	/// Native session identity.
	pub session: String,
	/// Secondary identity.
	pub secondary: String,
	/// Signed OAuth token.
	pub token: String,
	/// CSRF token (script-readable).
	pub csrf: String,
}
impl Default for CookieNames {
	fn default() -> Self {
		Self {
			session: SESSION_COOKIE_NAME.into(),
			secondary: SECONDARY_COOKIE_NAME.into(),
			token: TOKEN_COOKIE_NAME.into(),
			csrf: CSRF_COOKIE_NAME.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn default_policy_is_secure_lax_and_rooted() {
		let cookie = CookiePolicy::default().build("session_user_id", "value".into(), true);

		assert_eq!(cookie.secure(), Some(true));
		assert_eq!(cookie.http_only(), Some(true));
		assert_eq!(cookie.same_site(), Some(SameSite::Lax));
		assert_eq!(cookie.path(), Some("/"));
		assert_eq!(cookie.domain(), None);
		assert_eq!(cookie.max_age(), None);
	}

	#[test]
	fn overrides_flow_into_built_cookies() {
		let policy = CookiePolicy::default()
			.with_secure(false)
			.with_path("/app")
			.with_domain("tunes.example")
			.with_max_age(Duration::days(7));
		let cookie = policy.build("oauth_token", "value".into(), true);

		assert_eq!(cookie.secure(), Some(false));
		assert_eq!(cookie.path(), Some("/app"));
		assert_eq!(cookie.domain(), Some("tunes.example"));
		assert_eq!(cookie.max_age(), Some(Duration::days(7)));
	}

	#[test]
	fn expired_cookies_clear_the_value() {
		let cookie = CookiePolicy::default().expired("csrf_token", false);

		assert_eq!(cookie.value(), "");
		assert_eq!(cookie.max_age(), Some(Duration::ZERO));
		assert_eq!(cookie.path(), Some("/"));
	}

	#[test]
	fn names_deserialize_with_defaults() {
		let names: CookieNames = serde_json::from_str(r#"{"session":"sid"}"#)
			.expect("Partial cookie names should deserialize.");

		assert_eq!(names.session, "sid");
		assert_eq!(names.token, TOKEN_COOKIE_NAME);
		assert_eq!(names.csrf, CSRF_COOKIE_NAME);
	}
}
