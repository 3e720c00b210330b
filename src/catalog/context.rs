//! Per-request call context handed to catalog providers.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
// self
use crate::{_prelude::*, auth::OAuthToken, catalog::ProviderError};

/// Cancellation, deadline, and credential for one catalog call.
///
/// Contexts are cheap to clone. [`CallContext::child`] derives a context whose cancellation
/// follows the parent but can also be cancelled on its own.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	cancellation: CancellationToken,
	deadline: Option<Instant>,
	credential: Option<Arc<OAuthToken>>,
}
impl CallContext {
	/// Creates a context with no deadline and no credential.
	pub fn new() -> Self {
		Self::default()
	}

	/// Uses `token` as the cancellation signal.
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = token;

		self
	}

	/// Sets an absolute deadline, keeping the earlier one if a deadline is already set.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(self.deadline.map_or(deadline, |current| current.min(deadline)));

		self
	}

	/// Sets a deadline `timeout` from now, keeping the earlier one if a deadline is already set.
	pub fn with_timeout(self, timeout: StdDuration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	/// Attaches the user's provider credential.
	pub fn with_credential(mut self, token: OAuthToken) -> Self {
		self.credential = Some(Arc::new(token));

		self
	}

	/// Credential providers should authenticate with, if any.
	pub fn credential(&self) -> Option<&OAuthToken> {
		self.credential.as_deref()
	}

	/// Cancellation signal for this call.
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancellation
	}

	/// Deadline for this call.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Whether the call has been cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancellation.is_cancelled()
	}

	/// Derives a context cancelled together with this one.
	pub fn child(&self) -> Self {
		Self {
			cancellation: self.cancellation.child_token(),
			deadline: self.deadline,
			credential: self.credential.clone(),
		}
	}

	/// Drives `fut` until it completes, the context is cancelled, or the deadline passes.
	///
	/// The future is dropped as soon as cancellation or the deadline wins.
	pub async fn run<T, F>(&self, fut: F) -> Result<T, ProviderError>
	where
		F: Future<Output = Result<T, ProviderError>>,
	{
		let deadline = async {
			match self.deadline {
				Some(deadline) => time::sleep_until(deadline).await,
				None => std::future::pending::<()>().await,
			}
		};

		tokio::select! {
			biased;
			_ = self.cancellation.cancelled() => Err(ProviderError::Cancelled),
			_ = deadline => Err(ProviderError::DeadlineExceeded),
			result = fut => result,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn deadline_wins_over_slow_futures() {
		let ctx = CallContext::new().with_timeout(StdDuration::from_millis(50));
		let result = ctx
			.run(async {
				time::sleep(StdDuration::from_secs(5)).await;

				Ok(1)
			})
			.await;

		assert_eq!(result, Err(ProviderError::DeadlineExceeded));
	}

	#[tokio::test]
	async fn cancelling_the_parent_cancels_children() {
		let parent = CallContext::new();
		let child = parent.child();

		parent.cancellation().cancel();

		assert!(child.is_cancelled());
		assert_eq!(child.run(async { Ok(1) }).await, Err(ProviderError::Cancelled));
	}

	#[tokio::test]
	async fn completed_futures_pass_through() {
		let ctx = CallContext::new().with_timeout(StdDuration::from_secs(5));

		assert_eq!(ctx.run(async { Ok::<_, ProviderError>(7) }).await, Ok(7));
		assert_eq!(
			ctx.run(async { Err::<u8, _>(ProviderError::Empty) }).await,
			Err(ProviderError::Empty)
		);
	}

	#[tokio::test]
	async fn earlier_deadline_is_kept() {
		let now = Instant::now();
		let ctx = CallContext::new()
			.with_deadline(now + StdDuration::from_secs(1))
			.with_deadline(now + StdDuration::from_secs(10));

		assert_eq!(ctx.deadline(), Some(now + StdDuration::from_secs(1)));
	}
}
