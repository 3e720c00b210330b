//! Redacted wrapper for access and refresh token material.

// self
use crate::_prelude::*;

/// Token secret that keeps sensitive material out of logs, spans, and panic messages.
///
/// Serialization is transparent so the wrapped value survives cookie and store round trips.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the secret as an `Authorization` header value for the given token type.
	pub fn authorization_value(&self, token_type: &str) -> String {
		if token_type.eq_ignore_ascii_case("bearer") || token_type.is_empty() {
			format!("Bearer {}", self.0)
		} else {
			format!("{token_type} {}", self.0)
		}
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn authorization_value_normalizes_bearer() {
		let secret = TokenSecret::new("abc");

		assert_eq!(secret.authorization_value("bearer"), "Bearer abc");
		assert_eq!(secret.authorization_value("Bearer"), "Bearer abc");
		assert_eq!(secret.authorization_value("MAC"), "MAC abc");
	}

	#[test]
	fn serializes_as_plain_string() {
		let json = serde_json::to_string(&TokenSecret::new("abc"))
			.expect("Token secret should serialize to JSON.");

		assert_eq!(json, "\"abc\"");
	}
}
