//! Provider capability trait and provider-level errors.

// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	catalog::{CallContext, Track},
};

/// Boxed future returned by [`CatalogProvider`] operations.
pub type ProviderFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ProviderError>> + 'a + Send>>;

/// A third-party music catalog.
///
/// Implementations should honor the cancellation token and deadline carried by the
/// [`CallContext`]; the aggregator also drops in-flight calls once either fires.
pub trait CatalogProvider
where
	Self: Send + Sync,
{
	/// Stable provider identifier, also used as the track-ID namespace.
	fn id(&self) -> &ProviderId;

	/// Free-text track search.
	fn search<'a>(&'a self, ctx: &'a CallContext, query: &'a str)
	-> ProviderFuture<'a, Vec<Track>>;

	/// Recommendations seeded by track IDs.
	fn recommend<'a>(
		&'a self,
		ctx: &'a CallContext,
		seed_ids: &'a [String],
	) -> ProviderFuture<'a, Vec<Track>>;
}

/// Failure of a single provider call.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderError {
	/// Transport failure reaching the provider.
	#[error("Provider could not be reached: {message}.")]
	Network {
		/// Transport failure summary.
		message: String,
	},
	/// Provider answered with an unusable response.
	#[error("Provider returned a bad response: {message}.")]
	BadResponse {
		/// Response failure summary.
		message: String,
	},
	/// Provider answered without a body.
	#[error("Provider returned an empty response.")]
	Empty,
	/// Provider is not available to serve the call.
	#[error("Provider is unavailable: {message}.")]
	Unavailable {
		/// Reason the provider could not serve the call.
		message: String,
	},
	/// The caller cancelled the request.
	#[error("Provider call was cancelled.")]
	Cancelled,
	/// The call outlived its deadline.
	#[error("Provider call exceeded its deadline.")]
	DeadlineExceeded,
	/// A nested aggregator failed as a whole.
	#[error(transparent)]
	Aggregate(Box<AggregateFailure>),
}

/// Every provider of an aggregation failed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("All {attempted} catalog providers failed.")]
pub struct AggregateFailure {
	/// Number of providers queried.
	pub attempted: usize,
	/// First failure in provider order.
	#[source]
	pub source: ProviderError,
}
