//! OAuth token record, lifecycle helpers, and builder.

// self
use crate::{_prelude::*, auth::secret::TokenSecret};

/// Lifecycle status for an [`OAuthToken`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is usable (or carries no expiry at all).
	Valid,
	/// Token is past its expiry and a refresh secret is available.
	Refreshable,
	/// Token is past its expiry and cannot be refreshed.
	Stale,
}

/// Errors produced by [`OAuthTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum OAuthTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
}

/// OAuth credential owned by one user's session.
///
/// The token is persisted under the owning user's ID and carried in a signed cookie. Only the
/// token lifecycle manager replaces it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh token secret, if the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Token type reported by the provider (usually `Bearer`).
	pub token_type: String,
	/// Expiry instant; `None` means no expiry is tracked.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub expiry: Option<OffsetDateTime>,
}
impl OAuthToken {
	const DEFAULT_TOKEN_TYPE: &'static str = "Bearer";

	/// Returns a builder for constructing tokens.
	pub fn builder() -> OAuthTokenBuilder {
		OAuthTokenBuilder::default()
	}

	/// Returns `true` if the token expired at (or before) `instant` shifted by `leeway`.
	///
	/// Tokens without an expiry never expire.
	pub fn is_expired_at(&self, instant: OffsetDateTime, leeway: Duration) -> bool {
		match self.expiry {
			Some(expiry) => expiry <= instant + leeway,
			None => false,
		}
	}

	/// Returns `true` if the token is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc(), Duration::ZERO)
	}

	/// Returns `true` when a refresh secret is present.
	pub fn can_refresh(&self) -> bool {
		self.refresh_token.as_ref().is_some_and(|secret| !secret.expose().is_empty())
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime, leeway: Duration) -> TokenStatus {
		if !self.is_expired_at(instant, leeway) {
			TokenStatus::Valid
		} else if self.can_refresh() {
			TokenStatus::Refreshable
		} else {
			TokenStatus::Stale
		}
	}

	/// Value for an outbound `Authorization` header.
	pub fn authorization_value(&self) -> String {
		self.access_token.authorization_value(&self.token_type)
	}
}
impl Debug for OAuthToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthToken")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_type", &self.token_type)
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Builder for [`OAuthToken`].
#[derive(Clone, Debug, Default)]
pub struct OAuthTokenBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	token_type: Option<String>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl OAuthTokenBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Carries over an optional refresh secret.
	pub fn maybe_refresh_token(mut self, secret: Option<TokenSecret>) -> Self {
		self.refresh_token = secret;

		self
	}

	/// Overrides the token type (defaults to `Bearer`).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Sets the instant relative expiries are measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces an [`OAuthToken`].
	pub fn build(self) -> Result<OAuthToken, OAuthTokenBuilderError> {
		let access_token = self.access_token.ok_or(OAuthTokenBuilderError::MissingAccessToken)?;
		let expiry = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) =>
				Some(self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta),
			(None, None) => None,
		};

		Ok(OAuthToken {
			access_token,
			refresh_token: self.refresh_token,
			token_type: self.token_type.unwrap_or_else(|| OAuthToken::DEFAULT_TOKEN_TYPE.into()),
			expiry,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_transitions_cover_all_states() {
		let token = OAuthToken::builder()
			.access_token("access")
			.refresh_token("refresh")
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token builder should succeed for status transitions.");

		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 00:30 UTC), Duration::ZERO),
			TokenStatus::Valid
		);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 01:00 UTC), Duration::ZERO),
			TokenStatus::Refreshable
		);
		assert_eq!(
			token.status_at(macros::datetime!(2025-01-01 00:59 UTC), Duration::minutes(5)),
			TokenStatus::Refreshable
		);

		let stale = OAuthToken { refresh_token: None, ..token };

		assert_eq!(
			stale.status_at(macros::datetime!(2025-01-01 02:00 UTC), Duration::ZERO),
			TokenStatus::Stale
		);
	}

	#[test]
	fn tokens_without_expiry_never_expire() {
		let token = OAuthToken::builder()
			.access_token("forever")
			.build()
			.expect("Token without expiry should build.");

		assert!(token.expiry.is_none());
		assert!(!token.is_expired());
		assert_eq!(token.token_type, "Bearer");
	}

	#[test]
	fn builder_handles_relative_expiry() {
		let token = OAuthToken::builder()
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token builder should support relative expiry calculations.");

		assert_eq!(token.expiry, Some(macros::datetime!(2025-01-01 00:30 UTC)));
	}

	#[test]
	fn empty_refresh_secret_is_not_refreshable() {
		let token = OAuthToken::builder()
			.access_token("a")
			.refresh_token("")
			.expires_at(macros::datetime!(2020-01-01 00:00 UTC))
			.build()
			.expect("Token fixture should build.");

		assert!(!token.can_refresh());
		assert!(OAuthToken::builder().build().is_err());
	}

	#[test]
	fn json_round_trip_keeps_expiry_and_redacts_debug() {
		let token = OAuthToken::builder()
			.access_token("access-1")
			.refresh_token("refresh-1")
			.expires_at(macros::datetime!(2025-06-01 12:00 UTC))
			.build()
			.expect("Token fixture should build.");
		let json = serde_json::to_string(&token).expect("Token should serialize.");
		let decoded: OAuthToken = serde_json::from_str(&json).expect("Token should deserialize.");

		assert_eq!(decoded, token);
		assert!(!format!("{token:?}").contains("access-1"));
	}
}
