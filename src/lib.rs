//! Credential lifecycle and multi-provider catalog aggregation for music-discovery services:
//! signed session cookies, double-submit CSRF guards, transparent OAuth refresh, and bounded
//! scatter-gather search across independent catalog providers.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod oauth;
pub mod obs;
pub mod security;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		http::ReqwestHttpClient,
		identity::{DefaultTokenErrorStrategy, IdentityDescriptor, TokenErrorStrategy},
		lifecycle::{ReqwestTokenManager, TokenManager},
		oauth::ReqwestTransportErrorMapper,
		security::SigningKey,
		session::{CookiePolicy, SessionCookies},
		store::{MemoryStore, TokenStore},
	};

	/// Signing key fixture shared by tests; long enough to pass key validation.
	pub const TEST_SIGNING_KEY: &[u8] = b"tune-broker-test-signing-key-0123456789";

	/// Builds the signing key fixture.
	pub fn test_signing_key() -> SigningKey {
		SigningKey::new(TEST_SIGNING_KEY).expect("Test signing key fixture should be valid.")
	}

	/// Builds session cookies over the test key with `Secure` disabled.
	pub fn test_session_cookies() -> SessionCookies {
		SessionCookies::new(test_signing_key(), CookiePolicy::default().with_secure(false))
			.expect("Test session cookies should build.")
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`TokenManager`] backed by an in-memory store, default error strategy, test
	/// cookies, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_manager(
		descriptor: IdentityDescriptor,
		client_id: &str,
		client_secret: &str,
	) -> (ReqwestTokenManager, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let manager = build_reqwest_test_manager_with_store(
			store.clone(),
			descriptor,
			client_id,
			client_secret,
		);

		(manager, store)
	}

	/// Same as [`build_reqwest_test_manager`] over a caller-provided token store.
	pub fn build_reqwest_test_manager_with_store(
		store: Arc<dyn TokenStore>,
		descriptor: IdentityDescriptor,
		client_id: &str,
		client_secret: &str,
	) -> ReqwestTokenManager {
		let strategy: Arc<dyn TokenErrorStrategy> = Arc::new(DefaultTokenErrorStrategy);

		TokenManager::with_http_client(
			store,
			descriptor,
			strategy,
			client_id,
			test_session_cookies(),
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.with_client_secret(client_secret)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use cookie;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
