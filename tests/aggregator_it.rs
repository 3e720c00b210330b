// std
use std::{sync::Arc, time::Duration as StdDuration};
// crates.io
use tokio::time;
use tokio_util::sync::CancellationToken;
// self
use tune_broker::{
	auth::{OAuthToken, ProviderId},
	catalog::{
		AggregateFailure, Aggregator, CallContext, CatalogProvider, Namespaced, ProviderError,
		ProviderFuture, Track,
	},
};

struct StaticProvider {
	id: ProviderId,
	answer: Result<Vec<Track>, ProviderError>,
	delay: StdDuration,
}
impl StaticProvider {
	fn new(id: &str, answer: Result<Vec<Track>, ProviderError>) -> Self {
		Self {
			id: ProviderId::new(id).expect("Provider identifier fixture should be valid."),
			answer,
			delay: StdDuration::ZERO,
		}
	}

	fn ok(id: &str, track_ids: &[&str]) -> Self {
		Self::new(id, Ok(track_ids.iter().map(|track| Track::new(*track, *track)).collect()))
	}

	fn delayed(mut self, delay: StdDuration) -> Self {
		self.delay = delay;

		self
	}
}
impl CatalogProvider for StaticProvider {
	fn id(&self) -> &ProviderId {
		&self.id
	}

	fn search<'a>(&'a self, _: &'a CallContext, _: &'a str) -> ProviderFuture<'a, Vec<Track>> {
		Box::pin(async move {
			time::sleep(self.delay).await;

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

/// Echoes the access token of the call's credential as a single track.
struct CredentialEcho {
	id: ProviderId,
}
impl CatalogProvider for CredentialEcho {
	fn id(&self) -> &ProviderId {
		&self.id
	}

	fn search<'a>(&'a self, ctx: &'a CallContext, _: &'a str) -> ProviderFuture<'a, Vec<Track>> {
		Box::pin(async move {
			let token = ctx.credential().ok_or(ProviderError::Unavailable {
				message: "missing credential".into(),
			})?;

			Ok(vec![Track::new("echo", token.access_token.expose())])
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

fn aggregator(providers: Vec<Arc<dyn CatalogProvider>>) -> Aggregator {
	Aggregator::new(
		ProviderId::new("everything").expect("Aggregator identifier should be valid."),
		providers,
	)
}

fn ids(tracks: &[Track]) -> Vec<&str> {
	tracks.iter().map(|track| track.id.as_str()).collect()
}

#[tokio::test]
async fn overlapping_results_merge_into_a_set() {
	let merged = aggregator(vec![
		Arc::new(StaticProvider::ok("spotify", &["1", "2"])),
		Arc::new(StaticProvider::ok("deezer", &["2", "3"])),
	])
	.search_all(&CallContext::new(), "daft punk")
	.await
	.expect("Aggregation should succeed.");

	assert_eq!(ids(&merged), ["1", "2", "3"]);
}

#[tokio::test]
async fn merge_order_follows_provider_order_not_completion_order() {
	let merged = aggregator(vec![
		Arc::new(StaticProvider::ok("slow", &["a", "b"]).delayed(StdDuration::from_millis(30))),
		Arc::new(StaticProvider::ok("fast", &["c", "a"])),
	])
	.recommend_all(&CallContext::new(), &["seed".into()])
	.await
	.expect("Aggregation should succeed.");

	assert_eq!(ids(&merged), ["a", "b", "c"]);
}

#[tokio::test]
async fn partial_failures_are_tolerated() {
	let merged = aggregator(vec![
		Arc::new(StaticProvider::new(
			"broken",
			Err(ProviderError::Network { message: "connection reset".into() }),
		)),
		Arc::new(StaticProvider::ok("healthy", &["1"])),
	])
	.search_all(&CallContext::new(), "q")
	.await
	.expect("One healthy provider should be enough.");

	assert_eq!(ids(&merged), ["1"]);
}

#[tokio::test]
async fn successful_empty_answers_are_not_failures() {
	let merged = aggregator(vec![
		Arc::new(StaticProvider::ok("quiet", &[])),
		Arc::new(StaticProvider::new("broken", Err(ProviderError::Empty))),
	])
	.search_all(&CallContext::new(), "q")
	.await
	.expect("An empty success still counts as success.");

	assert!(merged.is_empty());
}

#[tokio::test]
async fn total_failure_reports_the_first_error_in_provider_order() {
	let failure = aggregator(vec![
		Arc::new(
			StaticProvider::new("first", Err(ProviderError::BadResponse { message: "html".into() }))
				.delayed(StdDuration::from_millis(20)),
		),
		Arc::new(StaticProvider::new("second", Err(ProviderError::Empty))),
	])
	.search_all(&CallContext::new(), "q")
	.await
	.expect_err("Every provider failed.");

	assert_eq!(
		failure,
		AggregateFailure {
			attempted: 2,
			source: ProviderError::BadResponse { message: "html".into() },
		}
	);
}

#[tokio::test]
async fn zero_providers_yield_an_empty_list() {
	let merged = aggregator(Vec::new())
		.search_all(&CallContext::new(), "q")
		.await
		.expect("No providers is not an error.");

	assert!(merged.is_empty());
}

#[tokio::test(start_paused = true)]
async fn timed_out_providers_count_as_failures() {
	let merged = aggregator(vec![
		Arc::new(StaticProvider::ok("slow", &["late"]).delayed(StdDuration::from_secs(5))),
		Arc::new(StaticProvider::ok("fast", &["on-time"])),
	])
	.with_timeout(StdDuration::from_millis(100))
	.search_all(&CallContext::new(), "q")
	.await
	.expect("The fast provider should carry the aggregation.");

	assert_eq!(ids(&merged), ["on-time"]);

	let failure = aggregator(vec![Arc::new(
		StaticProvider::ok("slow", &["late"]).delayed(StdDuration::from_secs(5)),
	)])
	.search_all(&CallContext::new().with_timeout(StdDuration::from_millis(50)), "q")
	.await
	.expect_err("The caller's deadline should fail a lone slow provider.");

	assert_eq!(failure.source, ProviderError::DeadlineExceeded);
}

#[tokio::test]
async fn cancellation_reaches_every_provider() {
	let token = CancellationToken::new();
	let ctx = CallContext::new().with_cancellation(token.clone());

	token.cancel();

	let failure = aggregator(vec![
		Arc::new(StaticProvider::ok("a", &["1"]).delayed(StdDuration::from_secs(1))),
		Arc::new(StaticProvider::ok("b", &["2"]).delayed(StdDuration::from_secs(1))),
	])
	.search_all(&ctx, "q")
	.await
	.expect_err("Cancelled aggregations should fail.");

	assert_eq!(failure, AggregateFailure { attempted: 2, source: ProviderError::Cancelled });
}

#[tokio::test]
async fn nested_aggregators_and_namespaces_compose() {
	let inner = aggregator(vec![
		Arc::new(Namespaced::new(StaticProvider::ok("spotify", &["1"]))),
		Arc::new(Namespaced::new(StaticProvider::ok("deezer", &["1"]))),
	]);
	let merged = aggregator(vec![Arc::new(inner), Arc::new(StaticProvider::ok("local", &["x"]))])
		.search_all(&CallContext::new(), "q")
		.await
		.expect("Nested aggregation should succeed.");

	assert_eq!(ids(&merged), ["spotify:1", "deezer:1", "x"]);
}

#[tokio::test]
async fn credentials_travel_with_the_call_context() {
	let token =
		OAuthToken::builder().access_token("access-1").build().expect("Token should build.");
	let merged = aggregator(vec![Arc::new(CredentialEcho {
		id: ProviderId::new("echo").expect("Provider identifier should be valid."),
	})])
	.search_all(&CallContext::new().with_credential(token), "q")
	.await
	.expect("Credentialed aggregation should succeed.");

	assert_eq!(merged[0].name, "access-1");
}
