//! Thread-safe in-memory store for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{OAuthToken, UserId},
	catalog::Track,
	store::{FavoriteStore, StoreFuture, StoreState, TokenStore},
};

/// Keeps tokens and favorites in process memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<StoreState>>);
impl TokenStore for MemoryStore {
	fn save_token<'a>(&'a self, user: &'a UserId, token: OAuthToken) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().put_token(user, token);

			Ok(())
		})
	}

	fn get_token<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<OAuthToken>> {
		Box::pin(async move { Ok(self.0.read().token(user)) })
	}
}
impl FavoriteStore for MemoryStore {
	fn save_favorite<'a>(&'a self, user: &'a UserId, track: Track) -> StoreFuture<'a, bool> {
		Box::pin(async move { Ok(self.0.write().add_favorite(user, track)) })
	}

	fn list_favorites<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Vec<Track>> {
		Box::pin(async move { Ok(self.0.read().favorites(user)) })
	}
}
