//! Validated description of the OAuth identity provider sessions are issued by.

// self
use crate::{_prelude::*, auth::ProviderId};

/// Client authentication mode for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
	/// Public clients without a secret.
	NoneWithPkce,
}

/// Endpoints of the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEndpoints {
	/// Authorization endpoint users are redirected to at login.
	pub authorization: Url,
	/// Token endpoint used for refresh exchanges.
	pub token: Url,
}

/// Errors raised while validating an [`IdentityDescriptor`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum DescriptorError {
	/// Authorization endpoint was not provided.
	#[error("Missing authorization endpoint.")]
	MissingAuthorizationEndpoint,
	/// Token endpoint was not provided.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Endpoints must use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Immutable identity-provider descriptor consumed by the token lifecycle manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDescriptor {
	/// Provider identifier.
	pub id: ProviderId,
	/// Provider endpoints.
	pub endpoints: IdentityEndpoints,
	/// How the client authenticates at the token endpoint.
	pub client_auth_method: ClientAuthMethod,
}
impl IdentityDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> IdentityDescriptorBuilder {
		IdentityDescriptorBuilder::new(id)
	}
}

/// Builder for [`IdentityDescriptor`] values.
#[derive(Debug)]
pub struct IdentityDescriptorBuilder {
	id: ProviderId,
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	client_auth_method: ClientAuthMethod,
}
impl IdentityDescriptorBuilder {
	/// Creates a builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			authorization_endpoint: None,
			token_endpoint: None,
			client_auth_method: ClientAuthMethod::default(),
		}
	}

	/// Sets the authorization endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Overrides the client authentication method.
	pub fn client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<IdentityDescriptor, DescriptorError> {
		let authorization =
			self.authorization_endpoint.ok_or(DescriptorError::MissingAuthorizationEndpoint)?;
		let token = self.token_endpoint.ok_or(DescriptorError::MissingTokenEndpoint)?;

		validate_endpoint("authorization", &authorization)?;
		validate_endpoint("token", &token)?;

		Ok(IdentityDescriptor {
			id: self.id,
			endpoints: IdentityEndpoints { authorization, token },
			client_auth_method: self.client_auth_method,
		})
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DescriptorError> {
	if url.scheme() != "https" {
		Err(DescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	} else {
		Ok(())
	}
}
