// crates.io
use ::http::{HeaderMap, Method};
// self
use crate::{_prelude::*, auth::UserId, session::SessionCookies};

impl SessionCookies {
	/// Resolves the native session identity.
	///
	/// Missing, malformed, and forged cookies all yield [`Error::Unauthenticated`].
	pub fn resolve_session(&self, headers: &HeaderMap) -> Result<UserId> {
		self.verified_identity(headers, &self.names().session, self.session_key())
			.ok_or(Error::Unauthenticated)
	}

	/// Resolves the secondary identity under its own signing namespace.
	pub fn resolve_secondary(&self, headers: &HeaderMap) -> Result<UserId> {
		self.verified_identity(headers, &self.names().secondary, self.secondary_key())
			.ok_or(Error::Unauthenticated)
	}

	/// Resolves the session and, for state-changing methods, enforces the CSRF check.
	///
	/// Identity is checked first, so an anonymous request is rejected with
	/// [`Error::Unauthenticated`] even when its CSRF token is also missing.
	pub fn require_user(&self, method: &Method, headers: &HeaderMap) -> Result<UserId> {
		let user = self.resolve_session(headers)?;

		if !self.csrf().check(method, headers) {
			return Err(Error::ForbiddenCsrf);
		}

		Ok(user)
	}
}
