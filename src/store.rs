//! Persistence contracts the broker needs, plus in-memory and JSON-file backends.
//!
//! Only two concerns are persisted: the OAuth token of each user, and the user's favorite
//! tracks. How rows are laid out is left to the backend.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{OAuthToken, UserId},
	catalog::Track,
};

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Token persistence keyed by user.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the token of `user`.
	fn save_token<'a>(&'a self, user: &'a UserId, token: OAuthToken) -> StoreFuture<'a, ()>;

	/// Fetches the token of `user`, if any.
	fn get_token<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Option<OAuthToken>>;
}

/// Favorite-track persistence keyed by user.
pub trait FavoriteStore
where
	Self: Send + Sync,
{
	/// Saves `track` for `user`; returns `false` if a track with the same ID was already saved.
	fn save_favorite<'a>(&'a self, user: &'a UserId, track: Track) -> StoreFuture<'a, bool>;

	/// Lists the favorites of `user` in the order they were saved.
	fn list_favorites<'a>(&'a self, user: &'a UserId) -> StoreFuture<'a, Vec<Track>>;
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Records could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Records shared by the built-in backends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct StoreState {
	tokens: BTreeMap<UserId, OAuthToken>,
	favorites: BTreeMap<UserId, Vec<Track>>,
}
impl StoreState {
	pub(crate) fn put_token(&mut self, user: &UserId, token: OAuthToken) {
		self.tokens.insert(user.clone(), token);
	}

	pub(crate) fn token(&self, user: &UserId) -> Option<OAuthToken> {
		self.tokens.get(user).cloned()
	}

	pub(crate) fn add_favorite(&mut self, user: &UserId, track: Track) -> bool {
		let saved = self.favorites.entry(user.clone()).or_default();

		if saved.iter().any(|existing| existing.id == track.id) {
			return false;
		}

		saved.push(track);

		true
	}

	pub(crate) fn favorites(&self, user: &UserId) -> Vec<Track> {
		self.favorites.get(user).cloned().unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn user(id: &str) -> UserId {
		UserId::new(id).expect("User fixture should be valid.")
	}

	#[test]
	fn favorites_are_deduplicated_per_user() {
		let mut state = StoreState::default();
		let alice = user("alice");
		let bob = user("bob");

		assert!(state.add_favorite(&alice, Track::new("deezer:1", "One")));
		assert!(!state.add_favorite(&alice, Track::new("deezer:1", "One again")));
		assert!(state.add_favorite(&alice, Track::new("spotify:1", "Other one")));
		assert!(state.add_favorite(&bob, Track::new("deezer:1", "One")));

		let names = state.favorites(&alice).into_iter().map(|t| t.name).collect::<Vec<_>>();

		assert_eq!(names, ["One", "Other one"]);
		assert!(state.favorites(&user("carol")).is_empty());
	}

	#[test]
	fn state_serializes_users_as_map_keys() {
		let mut state = StoreState::default();

		state.add_favorite(&user("alice"), Track::new("deezer:1", "One"));

		let json = serde_json::to_string(&state).expect("State should serialize.");
		let decoded: StoreState = serde_json::from_str(&json).expect("State should deserialize.");

		assert!(json.contains("\"alice\""));
		assert_eq!(decoded, state);
	}
}
