//! Bounded scatter-gather across catalog providers.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{sync::Semaphore, task::JoinSet};
// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	catalog::{AggregateFailure, CallContext, CatalogProvider, ProviderError, ProviderFuture, Track},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Tuning knobs for an [`Aggregator`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregatorSettings {
	/// Maximum provider calls in flight; `0` means one slot per provider.
	pub max_concurrent: usize,
	/// Optional per-aggregation timeout in milliseconds.
	pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug)]
enum CatalogRequest {
	Search(Arc<str>),
	Recommend(Arc<[String]>),
}
impl CatalogRequest {
	fn flow(&self) -> FlowKind {
		match self {
			Self::Search(_) => FlowKind::Search,
			Self::Recommend(_) => FlowKind::Recommend,
		}
	}

	async fn dispatch(
		&self,
		provider: &dyn CatalogProvider,
		ctx: &CallContext,
	) -> Result<Vec<Track>, ProviderError> {
		match self {
			Self::Search(query) => provider.search(ctx, query).await,
			Self::Recommend(seed_ids) => provider.recommend(ctx, seed_ids).await,
		}
	}
}

/// Fans one catalog request out to every configured provider and merges the answers.
///
/// Providers run concurrently on a [`JoinSet`], at most `max_concurrent` at a time. Results
/// are merged only after every task finished, in configured provider order, so the first
/// provider returning a given track ID wins the duplicate. The call succeeds when at least one
/// provider succeeded; failures of the others are logged and dropped. When every provider
/// failed the first error in provider order is returned inside an [`AggregateFailure`].
///
/// An aggregator is itself a [`CatalogProvider`], so aggregators can be nested.
#[derive(Clone)]
pub struct Aggregator {
	id: ProviderId,
	providers: Vec<Arc<dyn CatalogProvider>>,
	max_concurrent: usize,
	timeout: Option<StdDuration>,
}
impl Aggregator {
	/// Creates an aggregator over `providers`, queried and merged in the given order.
	pub fn new(id: ProviderId, providers: Vec<Arc<dyn CatalogProvider>>) -> Self {
		Self { id, providers, max_concurrent: 0, timeout: None }
	}

	/// Applies deserialized settings.
	pub fn with_settings(mut self, settings: &AggregatorSettings) -> Self {
		self.max_concurrent = settings.max_concurrent;
		self.timeout = settings.timeout_ms.map(StdDuration::from_millis);

		self
	}

	/// Caps the number of provider calls in flight; `0` restores one slot per provider.
	pub fn with_max_concurrent(mut self, limit: usize) -> Self {
		self.max_concurrent = limit;

		self
	}

	/// Bounds every aggregation; the caller's own deadline still applies if it is earlier.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Configured providers, in merge order.
	pub fn providers(&self) -> &[Arc<dyn CatalogProvider>] {
		&self.providers
	}

	/// Effective concurrency limit.
	pub fn concurrency_limit(&self) -> usize {
		match self.max_concurrent {
			0 => self.providers.len(),
			limit => limit.min(self.providers.len()),
		}
	}

	/// Searches every provider for `query`.
	pub async fn search_all(
		&self,
		ctx: &CallContext,
		query: &str,
	) -> Result<Vec<Track>, AggregateFailure> {
		self.scatter(ctx, CatalogRequest::Search(Arc::from(query))).await
	}

	/// Asks every provider for recommendations seeded by `seed_ids`.
	pub async fn recommend_all(
		&self,
		ctx: &CallContext,
		seed_ids: &[String],
	) -> Result<Vec<Track>, AggregateFailure> {
		self.scatter(ctx, CatalogRequest::Recommend(Arc::from(seed_ids))).await
	}

	async fn scatter(
		&self,
		ctx: &CallContext,
		request: CatalogRequest,
	) -> Result<Vec<Track>, AggregateFailure> {
		if self.providers.is_empty() {
			return Ok(Vec::new());
		}

		let span = FlowSpan::new(request.flow(), "scatter").with_providers(self.providers.len());

		span.start();

		let result = span.instrument(self.scatter_inner(ctx, request)).await;

		span.finish_with(&result);

		result
	}

	async fn scatter_inner(
		&self,
		ctx: &CallContext,
		request: CatalogRequest,
	) -> Result<Vec<Track>, AggregateFailure> {
		let attempted = self.providers.len();
		let permits = Arc::new(Semaphore::new(self.concurrency_limit()));
		let ctx = match self.timeout {
			Some(timeout) => ctx.clone().with_timeout(timeout),
			None => ctx.clone(),
		};
		let mut tasks = JoinSet::new();

		for (index, provider) in self.providers.iter().enumerate() {
			let provider = Arc::clone(provider);
			let permits = Arc::clone(&permits);
			let request = request.clone();
			let task_ctx = ctx.child();

			tasks.spawn(async move {
				let result = task_ctx
					.run(async {
						let _permit = permits.acquire().await.map_err(|_| {
							ProviderError::Unavailable { message: "concurrency limiter closed".into() }
						})?;

						request.dispatch(&*provider, &task_ctx).await
					})
					.await;

				(index, result)
			});
		}

		let mut slots = (0..attempted).map(|_| None).collect::<Vec<_>>();

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((index, result)) =>
					if let Some(slot) = slots.get_mut(index) {
						*slot = Some(result);
					},
				Err(e) => {
					obs::flow_event!(warn, error = %e, "Catalog provider task did not complete.");
				},
			}
		}

		let mut merged = Vec::new();
		let mut seen = HashSet::new();
		let mut first_error = None;
		let mut succeeded = false;

		for (provider, slot) in self.providers.iter().zip(slots) {
			let result = slot.unwrap_or_else(|| {
				Err(ProviderError::Unavailable { message: "provider task aborted".into() })
			});

			match result {
				Ok(tracks) => {
					obs::record_provider_outcome(provider.id(), FlowOutcome::Success);
					obs::flow_event!(
						debug,
						provider = %provider.id(),
						count = tracks.len(),
						"Catalog provider answered."
					);

					succeeded = true;

					for track in tracks {
						if seen.insert(track.id.clone()) {
							merged.push(track);
						}
					}
				},
				Err(e) => {
					obs::record_provider_outcome(provider.id(), FlowOutcome::Failure);
					obs::flow_event!(
						warn,
						provider = %provider.id(),
						error = %e,
						"Catalog provider failed."
					);

					if first_error.is_none() {
						first_error = Some(e);
					}
				},
			}
		}

		match (succeeded, first_error) {
			(false, Some(source)) => Err(AggregateFailure { attempted, source }),
			_ => Ok(merged),
		}
	}
}
impl Debug for Aggregator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Aggregator")
			.field("id", &self.id)
			.field("providers", &self.providers.iter().map(|p| p.id()).collect::<Vec<_>>())
			.field("max_concurrent", &self.max_concurrent)
			.field("timeout", &self.timeout)
			.finish()
	}
}
impl CatalogProvider for Aggregator {
	fn id(&self) -> &ProviderId {
		&self.id
	}

	fn search<'a>(
		&'a self,
		ctx: &'a CallContext,
		query: &'a str,
	) -> ProviderFuture<'a, Vec<Track>> {
		Box::pin(async move {
			self.search_all(ctx, query).await.map_err(|e| ProviderError::Aggregate(Box::new(e)))
		})
	}

	fn recommend<'a>(
		&'a self,
		ctx: &'a CallContext,
		seed_ids: &'a [String],
	) -> ProviderFuture<'a, Vec<Track>> {
		Box::pin(async move {
			self.recommend_all(ctx, seed_ids)
				.await
				.map_err(|e| ProviderError::Aggregate(Box::new(e)))
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use tokio::time;
	// self
	use super::*;

	struct Scripted {
		id: ProviderId,
		answer: Result<Vec<Track>, ProviderError>,
		delay: StdDuration,
		in_flight: Arc<AtomicUsize>,
		peak: Arc<AtomicUsize>,
	}
	impl Scripted {
		fn new(id: &str, answer: Result<Vec<Track>, ProviderError>) -> Self {
			Self {
				id: ProviderId::new(id).expect("Provider ID fixture should be valid."),
				answer,
				delay: StdDuration::ZERO,
				in_flight: Arc::default(),
				peak: Arc::default(),
			}
		}
	}
	impl CatalogProvider for Scripted {
		fn id(&self) -> &ProviderId {
			&self.id
		}

		fn search<'a>(
			&'a self,
			_: &'a CallContext,
			_: &'a str,
		) -> ProviderFuture<'a, Vec<Track>> {
			Box::pin(async move {
				let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

				self.peak.fetch_max(now, Ordering::SeqCst);
				time::sleep(self.delay).await;
				self.in_flight.fetch_sub(1, Ordering::SeqCst);

				self.answer.clone()
			})
		}

		fn recommend<'a>(
			&'a self,
			ctx: &'a CallContext,
			_: &'a [String],
		) -> ProviderFuture<'a, Vec<Track>> {
			self.search(ctx, "")
		}
	}

	fn tracks(ids: &[&str]) -> Vec<Track> {
		ids.iter().map(|id| Track::new(*id, format!("Track {id}"))).collect()
	}

	fn aggregator(providers: Vec<Arc<dyn CatalogProvider>>) -> Aggregator {
		Aggregator::new(ProviderId::new("all").expect("Provider ID should be valid."), providers)
	}

	#[tokio::test]
	async fn duplicates_keep_the_first_provider_copy() {
		let first = Scripted::new("a", Ok(vec![Track::new("2", "From A")]));
		let second = Scripted::new("b", Ok(vec![Track::new("2", "From B"), Track::new("3", "C")]));
		let merged = aggregator(vec![Arc::new(first), Arc::new(second)])
			.search_all(&CallContext::new(), "q")
			.await
			.expect("Aggregation should succeed.");

		assert_eq!(merged.len(), 2);
		assert_eq!(merged[0].name, "From A");
		assert_eq!(merged[1].id, "3");
	}

	#[tokio::test(start_paused = true)]
	async fn concurrency_limit_is_respected() {
		let in_flight = Arc::new(AtomicUsize::new(0));
		let peak = Arc::new(AtomicUsize::new(0));
		let providers = (0..6)
			.map(|i| {
				let mut provider = Scripted::new(&format!("p{i}"), Ok(tracks(&["x"])));

				provider.delay = StdDuration::from_millis(10);
				provider.in_flight = Arc::clone(&in_flight);
				provider.peak = Arc::clone(&peak);

				Arc::new(provider) as Arc<dyn CatalogProvider>
			})
			.collect();
		let aggregator = aggregator(providers).with_max_concurrent(2);

		assert_eq!(aggregator.concurrency_limit(), 2);

		let merged = aggregator
			.search_all(&CallContext::new(), "q")
			.await
			.expect("Aggregation should succeed.");

		assert_eq!(merged.len(), 1);
		assert_eq!(peak.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn nested_aggregators_surface_aggregate_errors() {
		let inner = aggregator(vec![Arc::new(Scripted::new("a", Err(ProviderError::Empty)))]);
		let error = inner
			.search(&CallContext::new(), "q")
			.await
			.expect_err("Inner aggregation should fail.");

		assert_eq!(
			error,
			ProviderError::Aggregate(Box::new(AggregateFailure {
				attempted: 1,
				source: ProviderError::Empty,
			}))
		);
	}

	#[test]
	fn zero_concurrency_means_one_slot_per_provider() {
		let settings: AggregatorSettings = serde_json::from_str(r#"{"timeout_ms":250}"#)
			.expect("Settings should deserialize.");
		let aggregator = aggregator(vec![
			Arc::new(Scripted::new("a", Ok(Vec::new()))),
			Arc::new(Scripted::new("b", Ok(Vec::new()))),
			Arc::new(Scripted::new("c", Ok(Vec::new()))),
		])
		.with_settings(&settings);

		assert_eq!(aggregator.concurrency_limit(), 3);
		assert_eq!(aggregator.timeout, Some(StdDuration::from_millis(250)));
	}
}
