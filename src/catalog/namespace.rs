//! Provider-namespaced track identifiers.

// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	catalog::{CallContext, CatalogProvider, ProviderFuture, Track},
};

/// Separator between the provider namespace and the provider-native track ID.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Wraps a provider so its track IDs are prefixed with `"{provider}:"`.
///
/// Two catalogs can then reuse the same native ID without colliding during deduplication.
/// Recommendation seeds are routed back by prefix: seeds owned by another provider are dropped,
/// and the call short-circuits to an empty list when none are left.
#[derive(Clone, Debug)]
pub struct Namespaced<P> {
	inner: P,
	prefix: String,
}
impl<P> Namespaced<P>
where
	P: CatalogProvider,
{
	/// Wraps `inner`, namespacing by its [`CatalogProvider::id`].
	pub fn new(inner: P) -> Self {
		let prefix = format!("{}{NAMESPACE_SEPARATOR}", inner.id());

		Self { inner, prefix }
	}

	/// Returns the wrapped provider.
	pub fn into_inner(self) -> P {
		self.inner
	}

	/// Qualifies a provider-native ID.
	pub fn qualify(&self, native_id: &str) -> String {
		format!("{}{native_id}", self.prefix)
	}

	/// Strips this provider's namespace, returning `None` for foreign IDs.
	pub fn native_id<'a>(&self, qualified_id: &'a str) -> Option<&'a str> {
		qualified_id.strip_prefix(self.prefix.as_str()).filter(|id| !id.is_empty())
	}
}
impl<P> CatalogProvider for Namespaced<P>
where
	P: CatalogProvider,
{
	fn id(&self) -> &ProviderId {
		self.inner.id()
	}

	fn search<'a>(
		&'a self,
		ctx: &'a CallContext,
		query: &'a str,
	) -> ProviderFuture<'a, Vec<Track>> {
		Box::pin(async move {
			let tracks = self.inner.search(ctx, query).await?;

			Ok(tracks
				.into_iter()
				.map(|track| Track { id: self.qualify(&track.id), ..track })
				.collect())
		})
	}

	fn recommend<'a>(
		&'a self,
		ctx: &'a CallContext,
		seed_ids: &'a [String],
	) -> ProviderFuture<'a, Vec<Track>> {
		Box::pin(async move {
			let seeds = seed_ids
				.iter()
				.filter_map(|id| self.native_id(id))
				.map(str::to_owned)
				.collect::<Vec<_>>();

			if seeds.is_empty() {
				return Ok(Vec::new());
			}

			let tracks = self.inner.recommend(ctx, &seeds).await?;

			Ok(tracks
				.into_iter()
				.map(|track| Track { id: self.qualify(&track.id), ..track })
				.collect())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	struct Echo {
		id: ProviderId,
	}
	impl CatalogProvider for Echo {
		fn id(&self) -> &ProviderId {
			&self.id
		}

		fn search<'a>(
			&'a self,
			_: &'a CallContext,
			query: &'a str,
		) -> ProviderFuture<'a, Vec<Track>> {
			Box::pin(async move { Ok(vec![Track::new(query, "Echo")]) })
		}

		fn recommend<'a>(
			&'a self,
			_: &'a CallContext,
			seed_ids: &'a [String],
		) -> ProviderFuture<'a, Vec<Track>> {
			Box::pin(async move {
				Ok(seed_ids.iter().map(|id| Track::new(format!("{id}-next"), "Next")).collect())
			})
		}
	}

	fn provider() -> Namespaced<Echo> {
		Namespaced::new(Echo { id: ProviderId::new("deezer").expect("Provider ID should be valid.") })
	}

	#[tokio::test]
	async fn search_results_are_prefixed() {
		let tracks = provider()
			.search(&CallContext::new(), "42")
			.await
			.expect("Echo search should succeed.");

		assert_eq!(tracks[0].id, "deezer:42");
	}

	#[tokio::test]
	async fn recommend_routes_only_owned_seeds() {
		let provider = provider();
		let seeds = ["deezer:1".to_owned(), "spotify:2".to_owned(), "deezer:".to_owned()];
		let tracks = provider
			.recommend(&CallContext::new(), &seeds)
			.await
			.expect("Echo recommend should succeed.");

		assert_eq!(tracks.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), ["deezer:1-next"]);

		let foreign = provider
			.recommend(&CallContext::new(), &["spotify:2".to_owned()])
			.await
			.expect("Foreign seeds should yield an empty list.");

		assert!(foreign.is_empty());
	}
}
