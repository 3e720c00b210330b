//! Service configuration loaded from JSON with environment overrides for secrets.

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*,
	auth::{ProviderId, TokenSecret},
	catalog::AggregatorSettings,
	error::ConfigError,
	identity::{ClientAuthMethod, IdentityDescriptor},
	security::SigningKey,
	session::{CookieNames, CookiePolicy, SessionCookies},
};

/// Environment variable overriding [`BrokerConfig::signing_key`].
pub const SIGNING_KEY_ENV: &str = "TUNE_BROKER_SIGNING_KEY";
/// Environment variable overriding [`IdentityConfig::client_secret`].
pub const CLIENT_SECRET_ENV: &str = "TUNE_BROKER_CLIENT_SECRET";

/// Top-level broker configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
	/// Master key every cookie signing key is derived from.
	pub signing_key: TokenSecret,
	/// Cookie attributes and names.
	#[serde(default)]
	pub cookies: CookieConfig,
	/// Identity provider used for token refresh.
	pub identity: IdentityConfig,
	/// Catalog fan-out tuning.
	#[serde(default)]
	pub aggregator: AggregatorSettings,
}
impl BrokerConfig {
	/// Parses a JSON document, reporting the path of the first offending field.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		let deserializer = &mut serde_json::Deserializer::from_str(json);

		Ok(serde_path_to_error::deserialize(deserializer)?)
	}

	/// Reads and parses the JSON document at `path`.
	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let json = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_json_str(&json)
	}

	/// Applies [`SIGNING_KEY_ENV`] and [`CLIENT_SECRET_ENV`] from the process environment.
	pub fn with_env_overrides(self) -> Self {
		self.with_overrides_from(|name| std::env::var(name).ok())
	}

	/// Applies secret overrides resolved through `lookup`; empty values are ignored.
	pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
		let resolve = |name| lookup(name).filter(|value: &String| !value.is_empty());

		if let Some(key) = resolve(SIGNING_KEY_ENV) {
			self.signing_key = TokenSecret::new(key);
		}
		if let Some(secret) = resolve(CLIENT_SECRET_ENV) {
			self.identity.client_secret = Some(TokenSecret::new(secret));
		}

		self
	}

	/// Validated master signing key.
	pub fn signing_key(&self) -> Result<SigningKey, ConfigError> {
		Ok(SigningKey::new(self.signing_key.expose())?)
	}

	/// Cookie attribute policy.
	pub fn cookie_policy(&self) -> CookiePolicy {
		let cookies = &self.cookies;
		let mut policy =
			CookiePolicy::default().with_secure(cookies.secure).with_path(cookies.path.clone());

		if let Some(domain) = &cookies.domain {
			policy = policy.with_domain(domain.clone());
		}
		if let Some(secs) = cookies.max_age_secs {
			policy = policy.with_max_age(Duration::seconds(i64::from(secs)));
		}

		policy
	}

	/// Cookie codec keyed by [`Self::signing_key`] with the configured policy and names.
	pub fn session_cookies(&self) -> Result<SessionCookies, ConfigError> {
		let cookies = SessionCookies::new(self.signing_key()?, self.cookie_policy())?
			.with_names(self.cookies.names.clone());

		Ok(cookies)
	}

	/// Validated identity descriptor.
	pub fn identity_descriptor(&self) -> Result<IdentityDescriptor, ConfigError> {
		let identity = &self.identity;
		let descriptor = IdentityDescriptor::builder(identity.id.clone())
			.authorization_endpoint(identity.authorization_endpoint.clone())
			.token_endpoint(identity.token_endpoint.clone())
			.client_auth_method(identity.client_auth_method)
			.build()?;

		Ok(descriptor)
	}

	/// Window before expiry in which tokens are already treated as expired.
	pub fn expiry_leeway(&self) -> Duration {
		Duration::seconds(i64::from(self.identity.expiry_leeway_secs))
	}
}

/// Cookie section of [`BrokerConfig`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CookieConfig {
	/// Adds the `Secure` attribute.
	pub secure: bool,
	/// Cookie `Path`.
	pub path: String,
	/// Optional cookie `Domain`.
	pub domain: Option<String>,
	/// Optional `Max-Age` in seconds; session cookies when absent.
	pub max_age_secs: Option<u32>,
	/// Cookie names.
	pub names: CookieNames,
}
impl Default for CookieConfig {
	fn default() -> Self {
		Self {
			secure: true,
			path: "/".into(),
			domain: None,
			max_age_secs: None,
			names: CookieNames::default(),
		}
	}
}

/// Identity provider section of [`BrokerConfig`].
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
	/// Identity provider ID.
	pub id: ProviderId,
	/// Authorization endpoint (HTTPS).
	pub authorization_endpoint: Url,
	/// Token endpoint (HTTPS).
	pub token_endpoint: Url,
	/// OAuth client ID.
	pub client_id: String,
	/// OAuth client secret.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
	/// Client authentication method at the token endpoint.
	#[serde(default)]
	pub client_auth_method: ClientAuthMethod,
	/// Expiry leeway in seconds.
	#[serde(default)]
	pub expiry_leeway_secs: u32,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const MINIMAL: &str = r#"{
		"signing_key": "0123456789abcdef0123456789abcdef",
		"identity": {
			"id": "spotify",
			"authorization_endpoint": "https://accounts.example/authorize",
			"token_endpoint": "https://accounts.example/api/token",
			"client_id": "tune-broker"
		}
	}"#;

	#[test]
	fn minimal_document_fills_defaults() {
		let config = BrokerConfig::from_json_str(MINIMAL).expect("Minimal config should parse.");

		assert_eq!(config.cookies, CookieConfig::default());
		assert_eq!(config.aggregator, AggregatorSettings::default());
		assert_eq!(config.identity.client_auth_method, ClientAuthMethod::ClientSecretBasic);
		assert_eq!(config.expiry_leeway(), Duration::ZERO);
		assert!(config.cookie_policy().secure());
		assert_eq!(config.cookie_policy().path(), "/");
		assert_eq!(
			config.session_cookies().expect("Cookies should build.").names().token,
			"oauth_token"
		);
		assert_eq!(
			config.identity_descriptor().expect("Descriptor should build.").id.as_ref(),
			"spotify"
		);
	}

	#[test]
	fn full_document_maps_every_section() {
		let json = r#"{
			"signing_key": "0123456789abcdef0123456789abcdef",
			"cookies": {
				"secure": false,
				"path": "/app",
				"domain": "tunes.example",
				"max_age_secs": 3600,
				"names": { "session": "sid" }
			},
			"identity": {
				"id": "spotify",
				"authorization_endpoint": "https://accounts.example/authorize",
				"token_endpoint": "https://accounts.example/api/token",
				"client_id": "tune-broker",
				"client_secret": "shh",
				"client_auth_method": "client_secret_post",
				"expiry_leeway_secs": 30
			},
			"aggregator": { "max_concurrent": 4, "timeout_ms": 2500 }
		}"#;
		let config = BrokerConfig::from_json_str(json).expect("Full config should parse.");
		let cookies = config.session_cookies().expect("Cookies should build.");

		assert!(!config.cookie_policy().secure());
		assert_eq!(cookies.names().session, "sid");
		assert_eq!(cookies.names().csrf, "csrf_token");
		assert_eq!(config.identity.client_secret.as_ref().map(TokenSecret::expose), Some("shh"));
		assert_eq!(config.identity.client_auth_method, ClientAuthMethod::ClientSecretPost);
		assert_eq!(config.expiry_leeway(), Duration::seconds(30));
		assert_eq!(config.aggregator.max_concurrent, 4);
		assert_eq!(config.aggregator.timeout_ms, Some(2500));
	}

	#[test]
	fn parse_errors_report_the_offending_path() {
		let json = MINIMAL.replace("\"client_id\"", "\"client_identifier\"");
		let err = BrokerConfig::from_json_str(&json).expect_err("Unknown fields must be rejected.");

		assert!(matches!(err, ConfigError::Parse { ref path, .. } if path.starts_with("identity")));
	}

	#[test]
	fn short_signing_keys_are_rejected() {
		let json = MINIMAL.replace("0123456789abcdef0123456789abcdef", "too-short");
		let config = BrokerConfig::from_json_str(&json).expect("Config should still parse.");

		assert!(matches!(config.signing_key(), Err(ConfigError::SigningKey(_))));
		assert!(config.session_cookies().is_err());
	}

	#[test]
	fn overrides_replace_secrets_and_skip_empty_values() {
		let config = BrokerConfig::from_json_str(MINIMAL)
			.expect("Minimal config should parse.")
			.with_overrides_from(|name| match name {
				SIGNING_KEY_ENV => Some("fedcba9876543210fedcba9876543210".into()),
				CLIENT_SECRET_ENV => Some(String::new()),
				_ => None,
			});

		assert_eq!(config.signing_key.expose(), "fedcba9876543210fedcba9876543210");
		assert!(config.identity.client_secret.is_none());
	}

	#[test]
	fn missing_files_surface_read_errors() {
		let err = BrokerConfig::from_path("/nonexistent/tune-broker.json")
			.expect_err("Missing file should fail.");

		assert!(matches!(err, ConfigError::Read { .. }));
	}
}
