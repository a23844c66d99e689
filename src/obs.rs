//! Spans, warnings, and counters for the two flows the relay runs: token refresh and chat.
//!
//! Both sinks are optional. With `tracing`, each flow runs in a `coze_relay.flow` span tagged
//! with `flow` and `stage`, and every failure logs one `warn` event. With `metrics`, each attempt
//! and its result bump `coze_relay_flow_total{flow,outcome}`; cache hits bump
//! `coze_relay_token_cache_hits_total`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

/// Relay flow being observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Signing an assertion and redeeming it for an access token.
	TokenRefresh,
	/// Forwarding one inbound message to the chat endpoint.
	Chat,
}
impl FlowKind {
	/// Label used for the `flow` span field and metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::TokenRefresh => "token_refresh",
			Self::Chat => "chat",
		}
	}
}

/// Point in a flow's life that gets counted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// The flow started.
	Attempt,
	/// The flow produced its value.
	Success,
	/// The flow ended in an error.
	Failure,
}
impl FlowOutcome {
	/// Outcome matching a finished flow's result.
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}

	/// Label used for the `outcome` metric label.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Success => "success",
			Self::Failure => "failure",
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcome_follows_result() {
		assert_eq!(FlowOutcome::of::<(), ()>(&Ok(())), FlowOutcome::Success);
		assert_eq!(FlowOutcome::of::<(), &str>(&Err("down")).as_str(), "failure");
		assert_eq!(FlowKind::TokenRefresh.as_str(), "token_refresh");
	}
}
