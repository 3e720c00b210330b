//! Transparent refresh of expired session tokens with per-user single-flight guards.

// crates.io
use ::http::HeaderMap;
use cookie::Cookie;
// self
use crate::{
	_prelude::*,
	auth::{OAuthToken, TokenStatus, UserId},
	error::RefreshError,
	http::TokenHttpClient,
	lifecycle::TokenManager,
	oauth::{BasicFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result of [`TokenManager::ensure_fresh`].
#[derive(Clone, Debug)]
pub struct TokenRenewal {
	/// Token to use for the outbound call.
	pub token: OAuthToken,
	/// Replacement token cookie to set on the response, present only after a refresh.
	pub cookie: Option<Cookie<'static>>,
	/// Whether `token` differs from the one passed in.
	pub refreshed: bool,
}
impl TokenRenewal {
	fn unchanged(token: OAuthToken) -> Self {
		Self { token, cookie: None, refreshed: false }
	}
}

impl<C, M> TokenManager<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Loads the token of `user` from the signed token cookie, falling back to the store.
	pub async fn load_token(&self, user: &UserId, headers: &HeaderMap) -> Result<Option<OAuthToken>> {
		if let Some(token) = self.cookies.read_token(headers, user) {
			return Ok(Some(token));
		}

		Ok(self.store.get_token(user).await?)
	}

	/// Returns `token` untouched unless it is expired and refreshable, in which case it is
	/// exchanged at the token endpoint, persisted, and re-issued as a cookie.
	///
	/// Persisting the refreshed token is best-effort; a store failure is logged and the fresh
	/// token is still returned.
	pub async fn ensure_fresh(&self, user: &UserId, token: OAuthToken) -> Result<TokenRenewal> {
		match token.status_at(OffsetDateTime::now_utc(), self.expiry_leeway) {
			TokenStatus::Valid | TokenStatus::Stale => return Ok(TokenRenewal::unchanged(token)),
			TokenStatus::Refreshable => {},
		}

		let span = FlowSpan::new(FlowKind::Refresh, "ensure_fresh").with_user(user);

		span.start();
		self.refresh_metrics.record_attempt();

		let lease = self.refresh_guard(user);
		let result = span
			.instrument(async {
				let _singleflight = lease.lock().await;

				self.refresh_locked(user, token).await
			})
			.await;

		drop(lease);

		if result.is_err() {
			self.refresh_metrics.record_failure();
		}

		span.finish_with(&result);

		result
	}

	/// Loads and then freshens the credential of `user`; `None` if the user has no token.
	pub async fn credential_for(
		&self,
		user: &UserId,
		headers: &HeaderMap,
	) -> Result<Option<TokenRenewal>> {
		match self.load_token(user, headers).await? {
			Some(token) => Ok(Some(self.ensure_fresh(user, token).await?)),
			None => Ok(None),
		}
	}

	async fn refresh_locked(&self, user: &UserId, stale: OAuthToken) -> Result<TokenRenewal> {
		if let Some(fresh) = self.coalesced_token(user, &stale).await {
			self.refresh_metrics.record_coalesced();
			obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Coalesced);
			obs::flow_event!(debug, user = %user, "Reusing token refreshed by a concurrent request.");

			let cookie = self.cookies.token_cookie(user, &fresh)?;

			return Ok(TokenRenewal { token: fresh, cookie: Some(cookie), refreshed: true });
		}

		let refresh_secret = stale.refresh_token.clone().ok_or(RefreshError::MissingRefreshToken)?;
		let facade = <BasicFacade<C, M>>::from_descriptor(
			&self.descriptor,
			&self.client_id,
			self.client_secret.as_ref().map(|secret| secret.expose()),
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
		.map_err(RefreshError::from)?;
		let mut fresh = facade
			.refresh(self.strategy.as_ref(), refresh_secret.expose())
			.await
			.inspect_err(|e| {
				obs::flow_event!(warn, user = %user, error = %e, "Token refresh was rejected.");
			})?;

		if fresh.refresh_token.is_none() {
			fresh.refresh_token = Some(refresh_secret);
		}
		if let Err(e) = self.store.save_token(user, fresh.clone()).await {
			obs::flow_event!(warn, user = %user, error = %e, "Failed to persist refreshed token.");
		}

		self.refresh_metrics.record_success();

		let cookie = self.cookies.token_cookie(user, &fresh)?;

		Ok(TokenRenewal { token: fresh, cookie: Some(cookie), refreshed: true })
	}

	/// Returns the stored token if a concurrent refresh already replaced `stale` with a valid one.
	async fn coalesced_token(&self, user: &UserId, stale: &OAuthToken) -> Option<OAuthToken> {
		let stored = match self.store.get_token(user).await {
			Ok(stored) => stored?,
			Err(e) => {
				obs::flow_event!(warn, user = %user, error = %e, "Failed to re-read stored token.");

				return None;
			},
		};
		let now = OffsetDateTime::now_utc();

		(stored.access_token != stale.access_token
			&& stored.status_at(now, self.expiry_leeway) == TokenStatus::Valid)
			.then_some(stored)
	}
}
