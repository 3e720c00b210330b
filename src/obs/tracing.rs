// self
use crate::{
	_prelude::*,
	auth::UserId,
	obs::{FlowKind, FlowOutcome, metrics},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one broker flow; without the `tracing` feature it only forwards outcomes to
/// the flow counters.
///
/// The span is named `tune_broker.flow` and carries `flow` and `stage` from the start. `user`,
/// `providers`, and `outcome` are filled in as the flow learns them.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span tagged with `kind` and the call-site `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"tune_broker.flow",
				flow = kind.as_str(),
				stage,
				user = tracing::field::Empty,
				providers = tracing::field::Empty,
				outcome = tracing::field::Empty,
			);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Flow this span observes.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Tags the span with the user whose credential the flow handles.
	pub fn with_user(self, user: &UserId) -> Self {
		#[cfg(feature = "tracing")]
		{
			self.span.record("user", tracing::field::display(user));
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = user;
		}

		self
	}

	/// Tags the span with the number of catalog providers fanned out to.
	pub fn with_providers(self, count: usize) -> Self {
		#[cfg(feature = "tracing")]
		{
			self.span.record("providers", count);
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = count;
		}

		self
	}

	/// Records the attempt counter for this flow.
	pub fn start(&self) {
		metrics::record_flow_outcome(self.kind, FlowOutcome::Attempt);
	}

	/// Records how the flow ended, both on the span and in the flow counters.
	pub fn finish(&self, outcome: FlowOutcome) {
		#[cfg(feature = "tracing")]
		{
			self.span.record("outcome", outcome.as_str());
		}

		metrics::record_flow_outcome(self.kind, outcome);
	}

	/// Records success or failure from `result`.
	pub fn finish_with<T, E>(&self, result: &Result<T, E>) {
		self.finish(if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure });
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
