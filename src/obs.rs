//! Optional observability helpers for broker flows.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `tune_broker.flow` with the `flow` and
//!   `stage` (call site) fields, `user` for credential flows, `providers` for fan-outs, and the
//!   final `outcome`, plus `warn`/`debug` events for provider failures and refresh outcomes.
//! - Enable `metrics` to increment `tune_broker_flow_total` for every attempt/success/failure,
//!   labeled by `flow` + `outcome`, and `tune_broker_provider_total` for every provider call,
//!   labeled by `provider` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event when the `tracing` feature is enabled; expands to nothing otherwise.
macro_rules! flow_event {
	($level:ident, $($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		{
			::tracing::$level!($($arg)+);
		}
	}};
}
pub(crate) use flow_event;

/// Broker flows observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Login cookie issuance.
	Login,
	/// Refresh token exchange.
	Refresh,
	/// Aggregated catalog search.
	Search,
	/// Aggregated catalog recommendations.
	Recommend,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Login => "login",
			FlowKind::Refresh => "refresh",
			FlowKind::Search => "search",
			FlowKind::Recommend => "recommend",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Work satisfied by a concurrent caller's result.
	Coalesced,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
			FlowOutcome::Coalesced => "coalesced",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
