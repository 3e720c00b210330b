//! Broker-level error types shared across sessions, refresh flows, providers, and stores.

// crates.io
use ::http::StatusCode;
// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Request-facing variants map onto HTTP statuses through [`Error::status_code`]; use
/// [`Error::public_message`] for response bodies so clients never learn which cookie or check
/// rejected them.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Missing or unverifiable session cookie.
	#[error("Authentication required.")]
	Unauthenticated,
	/// Authenticated, but the CSRF token is missing or mismatched on a state-changing request.
	#[error("CSRF token is missing or does not match.")]
	ForbiddenCsrf,
	/// A refresh token was present but the identity provider refresh failed.
	#[error("Token refresh failed.")]
	TokenRefreshFailed(
		#[from]
		#[source]
		RefreshError,
	),
	/// A single catalog provider call failed.
	#[error(transparent)]
	Provider(#[from] crate::catalog::ProviderError),
	/// Every configured catalog provider failed.
	#[error(transparent)]
	AggregateFailure(#[from] crate::catalog::AggregateFailure),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Value could not be signed.
	#[error(transparent)]
	Signing(#[from] crate::security::SigningError),
}
impl Error {
	/// HTTP status a handler should answer with for this error.
	pub fn status_code(&self) -> StatusCode {
		match self {
			Self::Unauthenticated => StatusCode::UNAUTHORIZED,
			Self::ForbiddenCsrf => StatusCode::FORBIDDEN,
			Self::TokenRefreshFailed(_) | Self::Provider(_) | Self::AggregateFailure(_) =>
				StatusCode::BAD_GATEWAY,
			Self::Storage(_) | Self::Config(_) | Self::Signing(_) =>
				StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// Generic, client-safe message for this error.
	pub fn public_message(&self) -> &'static str {
		match self {
			Self::Unauthenticated => "Authentication required.",
			Self::ForbiddenCsrf => "Forbidden.",
			Self::TokenRefreshFailed(_) => "Could not renew your session with the provider.",
			Self::Provider(_) | Self::AggregateFailure(_) => "Search failed.",
			Self::Storage(_) | Self::Config(_) | Self::Signing(_) => "Internal server error.",
		}
	}
}

/// Failures raised while exchanging a refresh token at the identity provider.
#[derive(Debug, ThisError)]
pub enum RefreshError {
	/// Provider rejected the refresh token.
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Token has been revoked and must not be reused.
	#[error("Token has been revoked.")]
	Revoked,
	/// The cached token carries no refresh secret.
	#[error("Cached token is missing a refresh token.")]
	MissingRefreshToken,
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem surfaced during the exchange.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Identity descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Identity descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::identity::DescriptorError),
	/// Signing key material was rejected.
	#[error(transparent)]
	SigningKey(#[from] crate::security::SigningKeyError),
	/// Token builder validation failed.
	#[error("Unable to build token.")]
	TokenBuild(#[from] crate::auth::OAuthTokenBuilderError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Configuration document could not be read.
	#[error("Failed to read configuration from {path}.")]
	Read {
		/// Path that failed to load.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration document is malformed.
	#[error("Configuration is invalid at `{path}`.")]
	Parse {
		/// JSON path of the offending field.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
