//! `oauth2`-crate facade performing the `grant_type=refresh_token` exchange.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthUrl, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RefreshToken, RequestTokenError, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenType},
};
// self
use crate::{
	_prelude::*,
	auth::{OAuthToken, TokenSecret},
	error::{ConfigError, RefreshError, TransientError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	identity::{
		ClientAuthMethod, IdentityDescriptor, TokenErrorContext, TokenErrorKind,
		TokenErrorStrategy,
	},
};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;

/// Maps transport failures into [`RefreshError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		strategy: &dyn TokenErrorStrategy,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> RefreshError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		_: &dyn TokenErrorStrategy,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> RefreshError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => transient(
				meta,
				format!("HTTP client error occurred while calling the token endpoint: {message}"),
			),
			_ => transient(meta, "HTTP client error occurred while calling the token endpoint"),
		}
	}
}

/// Refresh-token client for one identity provider.
pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &IdentityDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self, ConfigError> {
		let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url);

		match (descriptor.client_auth_method, client_secret) {
			(ClientAuthMethod::NoneWithPkce, _) => {},
			(method, Some(secret)) => {
				oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));

				if method == ClientAuthMethod::ClientSecretPost {
					oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
				}
			},
			(_, None) => {},
		}

		Ok(Self { oauth_client, http_client, error_mapper })
	}

	/// Exchanges `refresh_token` for a new token.
	///
	/// A response without `expires_in` yields a token with no tracked expiry.
	pub(crate) async fn refresh(
		&self,
		strategy: &dyn TokenErrorStrategy,
		refresh_token: &str,
	) -> Result<OAuthToken, RefreshError> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let secret = RefreshToken::new(refresh_token.to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&secret)
			.request_async(&handle)
			.await
			.map_err(|e| map_request_error(strategy, meta.take(), e, self.error_mapper.as_ref()))?;

		map_token_response(response)
	}
}

fn map_token_response(response: FacadeTokenResponse) -> Result<OAuthToken, RefreshError> {
	let mut builder = OAuthToken::builder()
		.access_token(response.access_token().secret().to_owned())
		.token_type(token_type_label(response.token_type()))
		.issued_at(OffsetDateTime::now_utc());

	if let Some(expires_in) = response.expires_in() {
		let secs = i64::try_from(expires_in.as_secs())
			.map_err(|_| ConfigError::ExpiresInOutOfRange)?;

		if secs <= 0 {
			return Err(ConfigError::NonPositiveExpiresIn.into());
		}

		builder = builder.expires_in(Duration::seconds(secs));
	}

	builder
		.maybe_refresh_token(
			response.refresh_token().map(|refresh| TokenSecret::new(refresh.secret().to_owned())),
		)
		.build().map_err(|e| ConfigError::from(e).into())
}

fn token_type_label(token_type: &BasicTokenType) -> String {
	match token_type {
		BasicTokenType::Bearer => "Bearer".into(),
		BasicTokenType::Mac => "MAC".into(),
		BasicTokenType::Extension(other) => other.clone(),
	}
}

fn map_request_error<E, M>(
	strategy: &dyn TokenErrorStrategy,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> RefreshError
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(strategy, response, meta),
		RequestTokenError::Request(error) => mapper.map_transport_error(strategy, meta, error),
		RequestTokenError::Parse(source, body) => {
			let status = meta_status(meta);
			let mut ctx = TokenErrorContext::default()
				.with_body_preview(String::from_utf8_lossy(&body).into_owned());

			if let Some(status) = status {
				ctx = ctx.with_http_status(status);
			}

			// Non-JSON error pages still carry a classifiable status.
			match status {
				Some(code) if code >= 400 => {
					let reason = format!("Token endpoint returned HTTP {code} with a non-OAuth body");

					classify(strategy, &ctx, meta, reason)
				},
				_ => TransientError::TokenResponseParse { source, status }.into(),
			}
		},
		RequestTokenError::Other(message) => transient(
			meta,
			format!("Token endpoint returned an unexpected response: {message}"),
		),
	}
}

fn map_server_response_error(
	strategy: &dyn TokenErrorStrategy,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> RefreshError {
	let mut ctx = TokenErrorContext::default().with_oauth_error(response.error().as_ref());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_error_description(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	let message = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	};

	classify(strategy, &ctx, meta, message)
}

fn classify(
	strategy: &dyn TokenErrorStrategy,
	ctx: &TokenErrorContext,
	meta: Option<&ResponseMetadata>,
	reason: String,
) -> RefreshError {
	match strategy.classify_token_error(ctx) {
		TokenErrorKind::InvalidGrant => RefreshError::InvalidGrant { reason },
		TokenErrorKind::Revoked => RefreshError::Revoked,
		TokenErrorKind::InvalidClient => RefreshError::InvalidClient { reason },
		TokenErrorKind::Transient => transient(meta, reason),
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> RefreshError {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::TokenEndpoint {
			message: "Request timed out while calling the token endpoint".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::from(err).into()
}

fn transient(meta: Option<&ResponseMetadata>, message: impl Into<String>) -> RefreshError {
	TransientError::TokenEndpoint {
		message: message.into(),
		status: meta_status(meta),
		retry_after: meta_retry_after(meta),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{auth::ProviderId, http::ReqwestHttpClient};

	fn descriptor(method: ClientAuthMethod) -> IdentityDescriptor {
		IdentityDescriptor::builder(
			ProviderId::new("spotify").expect("Provider ID fixture should be valid."),
		)
		.authorization_endpoint(
			Url::parse("https://accounts.example/authorize")
				.expect("Authorization URL fixture should parse."),
		)
		.token_endpoint(
			Url::parse("https://accounts.example/api/token").expect("Token URL fixture should parse."),
		)
		.client_auth_method(method)
		.build()
		.expect("Descriptor fixture should build.")
	}

	#[test]
	fn facade_builds_for_every_auth_method() {
		for method in [
			ClientAuthMethod::ClientSecretBasic,
			ClientAuthMethod::ClientSecretPost,
			ClientAuthMethod::NoneWithPkce,
		] {
			let facade =
				BasicFacade::<ReqwestHttpClient, ReqwestTransportErrorMapper>::from_descriptor(
					&descriptor(method),
					"client-id",
					Some("secret"),
					Arc::new(ReqwestHttpClient::default()),
					Arc::new(ReqwestTransportErrorMapper),
				);

			assert!(facade.is_ok(), "{method:?} should build a facade.");
		}
	}

	#[test]
	fn token_type_labels_follow_the_response() {
		assert_eq!(token_type_label(&BasicTokenType::Bearer), "Bearer");
		assert_eq!(token_type_label(&BasicTokenType::Extension("DPoP".into())), "DPoP");
	}
}
