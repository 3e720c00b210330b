//! Token lifecycle management: login persistence and transparent refresh.
//!
//! [`TokenManager`] owns every collaborator a refresh needs (store, identity descriptor, error
//! strategy, client credentials, transport, and cookie codec), all passed in explicitly.

mod metrics;
mod refresh;

pub use metrics::RefreshMetrics;
pub use refresh::TokenRenewal;

// crates.io
use cookie::Cookie;
// self
use crate::{
	_prelude::*,
	auth::{OAuthToken, TokenSecret, UserId},
	http::TokenHttpClient,
	identity::{IdentityDescriptor, TokenErrorStrategy},
	oauth::TransportErrorMapper,
	obs::{FlowKind, FlowSpan},
	session::SessionCookies,
	store::TokenStore,
};
#[cfg(feature = "reqwest")]
use crate::{
	config::BrokerConfig, error::ConfigError, http::ReqwestHttpClient,
	identity::DefaultTokenErrorStrategy, oauth::ReqwestTransportErrorMapper,
};

#[cfg(feature = "reqwest")]
/// Token manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Inspects, refreshes, and re-issues the OAuth tokens behind user sessions.
///
/// Refreshes are single-flight per user: concurrent requests for the same expired token wait
/// for the first one and reuse its result.
#[derive(Clone)]
pub struct TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	store: Arc<dyn TokenStore>,
	descriptor: IdentityDescriptor,
	strategy: Arc<dyn TokenErrorStrategy>,
	client_id: String,
	client_secret: Option<TokenSecret>,
	cookies: SessionCookies,
	expiry_leeway: Duration,
	refresh_metrics: Arc<RefreshMetrics>,
	refresh_guards: Arc<RefreshGuards>,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a manager over a caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		descriptor: IdentityDescriptor,
		strategy: Arc<dyn TokenErrorStrategy>,
		client_id: impl Into<String>,
		cookies: SessionCookies,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			strategy,
			client_id: client_id.into(),
			client_secret: None,
			cookies,
			expiry_leeway: Duration::ZERO,
			refresh_metrics: Default::default(),
			refresh_guards: Default::default(),
		}
	}

	/// Sets the client secret for confidential client authentication.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(TokenSecret::new(secret));

		self
	}

	/// Treats tokens as expired `leeway` before their recorded expiry. Negative values clamp
	/// to zero.
	pub fn with_expiry_leeway(mut self, leeway: Duration) -> Self {
		self.expiry_leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Identity provider this manager refreshes against.
	pub fn descriptor(&self) -> &IdentityDescriptor {
		&self.descriptor
	}

	/// Cookie codec used for issued cookies.
	pub fn cookies(&self) -> &SessionCookies {
		&self.cookies
	}

	/// Refresh counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	/// Persists the token obtained at login and returns the cookies to set on the response.
	pub async fn complete_login(
		&self,
		user: &UserId,
		token: OAuthToken,
	) -> Result<Vec<Cookie<'static>>> {
		let span = FlowSpan::new(FlowKind::Login, "complete_login").with_user(user);

		span.start();

		let result = span
			.instrument(async move {
				self.store.save_token(user, token.clone()).await?;

				Ok(self.cookies.login_cookies(user, &token)?)
			})
			.await;

		span.finish_with(&result);

		result
	}

	/// Cookies that end the session.
	pub fn logout_cookies(&self) -> Vec<Cookie<'static>> {
		self.cookies.logout_cookies()
	}

	fn refresh_guard<'a>(&'a self, user: &'a UserId) -> RefreshGuardLease<'a> {
		let guard = self
			.refresh_guards
			.lock()
			.entry(user.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(())))
			.clone();

		RefreshGuardLease { guards: &self.refresh_guards, user, guard }
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager that provisions its own reqwest transport.
	pub fn new(
		store: Arc<dyn TokenStore>,
		descriptor: IdentityDescriptor,
		strategy: Arc<dyn TokenErrorStrategy>,
		client_id: impl Into<String>,
		cookies: SessionCookies,
	) -> Self {
		Self::with_http_client(
			store,
			descriptor,
			strategy,
			client_id,
			cookies,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}

	/// Builds a manager from configuration with the default error strategy.
	pub fn from_config(
		config: &BrokerConfig,
		store: Arc<dyn TokenStore>,
	) -> Result<Self, ConfigError> {
		let identity = &config.identity;
		let mut manager = Self::new(
			store,
			config.identity_descriptor()?,
			Arc::new(DefaultTokenErrorStrategy),
			identity.client_id.clone(),
			config.session_cookies()?,
		)
		.with_expiry_leeway(config.expiry_leeway());

		if let Some(secret) = &identity.client_secret {
			manager = manager.with_client_secret(secret.expose());
		}

		Ok(manager)
	}
}

type RefreshGuards = Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>;

/// Holds one user's single-flight mutex for the duration of a refresh.
///
/// Dropping the lease, including when the refresh future is cancelled, removes the map entry
/// once no other lease shares it.
struct RefreshGuardLease<'a> {
	guards: &'a RefreshGuards,
	user: &'a UserId,
	guard: Arc<AsyncMutex<()>>,
}
impl RefreshGuardLease<'_> {
	async fn lock(&self) -> async_lock::MutexGuard<'_, ()> {
		self.guard.lock().await
	}
}
impl Drop for RefreshGuardLease<'_> {
	fn drop(&mut self) {
		let mut guards = self.guards.lock();

		// The map and this lease hold the only two references.
		if guards.get(self.user).is_some_and(|guard| Arc::strong_count(guard) == 2) {
			guards.remove(self.user);
		}
	}
}

impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("expiry_leeway", &self.expiry_leeway)
			.finish()
	}
}
