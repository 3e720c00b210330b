//! Issuing and reading the signed session cookie set.

// crates.io
use ::http::{HeaderMap, HeaderName};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use cookie::Cookie;
// self
use crate::{
	_prelude::*,
	auth::{OAuthToken, UserId},
	security::{self, CsrfGuard, SigningError, SigningKey, SigningKeyError},
	session::{CookieNames, CookiePolicy, jar},
};

const SESSION_NAMESPACE: &str = "tune-broker/session";
const SECONDARY_NAMESPACE: &str = "tune-broker/secondary";
const TOKEN_NAMESPACE: &str = "tune-broker/token";

#[derive(Serialize)]
struct TokenClaims<'a> {
	user: &'a UserId,
	token: &'a OAuthToken,
}

#[derive(Deserialize)]
struct OwnedTokenClaims {
	user: UserId,
	token: OAuthToken,
}

/// Signs, issues, and verifies every cookie that makes up a browser session.
///
/// The session and secondary identity cookies and the token cookie are each signed under a
/// namespace derived from one master key. The token cookie also binds the token to the user it
/// was issued for, so swapping token cookies between accounts fails verification.
#[derive(Clone, Debug)]
pub struct SessionCookies {
	session_key: SigningKey,
	secondary_key: SigningKey,
	token_key: SigningKey,
	policy: CookiePolicy,
	names: CookieNames,
	csrf: CsrfGuard,
}
impl SessionCookies {
	/// Derives the per-cookie keys from `key`.
	pub fn new(key: SigningKey, policy: CookiePolicy) -> Result<Self, SigningKeyError> {
		Ok(Self {
			session_key: key.namespaced(SESSION_NAMESPACE)?,
			secondary_key: key.namespaced(SECONDARY_NAMESPACE)?,
			token_key: key.namespaced(TOKEN_NAMESPACE)?,
			policy,
			names: CookieNames::default(),
			csrf: CsrfGuard::default(),
		})
	}

	/// Overrides the cookie names, including the one the CSRF guard reads.
	pub fn with_names(mut self, names: CookieNames) -> Self {
		self.csrf = CsrfGuard::new(names.csrf.clone(), self.csrf.header_name().clone());
		self.names = names;

		self
	}

	/// Overrides the header the CSRF guard expects the echoed token in.
	pub fn with_csrf_header(mut self, header: HeaderName) -> Self {
		self.csrf = CsrfGuard::new(self.names.csrf.clone(), header);

		self
	}

	/// Cookie attribute policy.
	pub fn policy(&self) -> &CookiePolicy {
		&self.policy
	}

	/// Configured cookie names.
	pub fn names(&self) -> &CookieNames {
		&self.names
	}

	/// CSRF guard bound to the configured cookie and header names.
	pub fn csrf(&self) -> &CsrfGuard {
		&self.csrf
	}

	/// Signed `HttpOnly` cookie carrying the native session identity.
	pub fn session_cookie(&self, user: &UserId) -> Result<Cookie<'static>, SigningError> {
		let value = security::sign(user, &self.session_key)?;

		Ok(self.policy.build(&self.names.session, value, true))
	}

	/// Signed `HttpOnly` cookie carrying a second, linked identity.
	pub fn secondary_cookie(&self, user: &UserId) -> Result<Cookie<'static>, SigningError> {
		let value = security::sign(user, &self.secondary_key)?;

		Ok(self.policy.build(&self.names.secondary, value, true))
	}

	/// Signed `HttpOnly` cookie carrying `token`, bound to `user`.
	pub fn token_cookie(
		&self,
		user: &UserId,
		token: &OAuthToken,
	) -> Result<Cookie<'static>, SigningError> {
		let json = serde_json::to_vec(&TokenClaims { user, token })
			.map_err(|e| SigningError::Encode { message: e.to_string() })?;
		let value = security::sign(&URL_SAFE_NO_PAD.encode(json), &self.token_key)?;

		Ok(self.policy.build(&self.names.token, value, true))
	}

	/// Reads the token cookie, returning the token only if it verifies and belongs to `user`.
	pub fn read_token(&self, headers: &HeaderMap, user: &UserId) -> Option<OAuthToken> {
		let raw = jar::cookie_value(headers, &self.names.token)?;
		let payload = security::verify(&raw, &self.token_key)?;
		let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
		let claims = serde_json::from_slice::<OwnedTokenClaims>(&json).ok()?;

		(claims.user == *user).then_some(claims.token)
	}

	/// Cookies set on successful login: session, token, and a fresh CSRF token.
	pub fn login_cookies(
		&self,
		user: &UserId,
		token: &OAuthToken,
	) -> Result<Vec<Cookie<'static>>, SigningError> {
		Ok(vec![
			self.session_cookie(user)?,
			self.token_cookie(user, token)?,
			self.csrf.issue(&self.policy),
		])
	}

	/// Expired cookies clearing every session cookie.
	pub fn logout_cookies(&self) -> Vec<Cookie<'static>> {
		vec![
			self.policy.expired(&self.names.session, true),
			self.policy.expired(&self.names.secondary, true),
			self.policy.expired(&self.names.token, true),
			self.policy.expired(&self.names.csrf, false),
		]
	}

	pub(crate) fn verified_identity(
		&self,
		headers: &HeaderMap,
		name: &str,
		key: &SigningKey,
	) -> Option<UserId> {
		let raw = jar::cookie_value(headers, name)?;
		let payload = security::verify(&raw, key)?;

		UserId::new(payload).ok()
	}

	pub(crate) fn session_key(&self) -> &SigningKey {
		&self.session_key
	}

	pub(crate) fn secondary_key(&self) -> &SigningKey {
		&self.secondary_key
	}
}
