//! Classification of token-endpoint failures.
//!
//! The classifier only sees crate-owned primitives (status, OAuth fields, a body preview), so
//! strategies stay independent of any HTTP client.

// self
use crate::_prelude::*;

/// Maps a failed token request onto the broker's refresh error categories.
pub trait TokenErrorStrategy
where
	Self: Send + Sync,
{
	/// Classifies the failure described by `ctx`.
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind;
}

/// Canonical token-endpoint failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenErrorKind {
	/// The refresh token was rejected.
	InvalidGrant,
	/// The refresh token was explicitly revoked.
	Revoked,
	/// Client authentication failed.
	InvalidClient,
	/// Failure is temporary and may be retried.
	Transient,
}

/// Primitive description of a failed token request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenErrorContext {
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Whether the failure happened below HTTP (DNS, TCP, TLS).
	pub network_error: bool,
}
impl TokenErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Context for transport-level failures.
	pub fn network_failure() -> Self {
		Self { network_error: true, ..Self::default() }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth `error` code.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to a bounded number of characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// RFC 6749 heuristics: structured OAuth fields first, then body hints, then the status code.
///
/// Network failures are always transient.
#[derive(Debug, Default)]
pub struct DefaultTokenErrorStrategy;
impl TokenErrorStrategy for DefaultTokenErrorStrategy {
	fn classify_token_error(&self, ctx: &TokenErrorContext) -> TokenErrorKind {
		if ctx.network_error {
			return TokenErrorKind::Transient;
		}

		let kind = ctx
			.oauth_error
			.as_deref()
			.and_then(match_error_code)
			.or_else(|| classify_text(ctx.error_description.as_deref()))
			.or_else(|| classify_text(ctx.body_preview.as_deref()))
			.unwrap_or_else(|| classify_status(ctx.http_status));

		// `invalid_grant` with a revocation hint is reported as revoked.
		if kind == TokenErrorKind::InvalidGrant && mentions_revocation(ctx) {
			TokenErrorKind::Revoked
		} else {
			kind
		}
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= TokenErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(TokenErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn match_error_code(value: &str) -> Option<TokenErrorKind> {
	if value.eq_ignore_ascii_case("invalid_grant") || value.eq_ignore_ascii_case("access_denied") {
		Some(TokenErrorKind::InvalidGrant)
	} else if value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
	{
		Some(TokenErrorKind::InvalidClient)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(TokenErrorKind::Transient)
	} else {
		None
	}
}

fn classify_text(text: Option<&str>) -> Option<TokenErrorKind> {
	let lowered = text?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("revoked") => Some(TokenErrorKind::Revoked),
		text if text.contains("invalid_grant") => Some(TokenErrorKind::InvalidGrant),
		text if text.contains("invalid_client") => Some(TokenErrorKind::InvalidClient),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(TokenErrorKind::Transient),
		_ => None,
	}
}

fn mentions_revocation(ctx: &TokenErrorContext) -> bool {
	[ctx.error_description.as_deref(), ctx.body_preview.as_deref()]
		.into_iter()
		.flatten()
		.any(|text| text.to_ascii_lowercase().contains("revoked"))
}

fn classify_status(status: Option<u16>) -> TokenErrorKind {
	match status {
		Some(400 | 404 | 410) => TokenErrorKind::InvalidGrant,
		Some(401 | 403) => TokenErrorKind::InvalidClient,
		_ => TokenErrorKind::Transient,
	}
}
