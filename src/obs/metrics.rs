// self
use crate::obs::{FlowKind, FlowOutcome};

/// Bumps `coze_relay_flow_total` for `kind` and `outcome`; a no-op unless `metrics` is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"coze_relay_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Bumps `coze_relay_token_cache_hits_total`; a no-op unless `metrics` is enabled.
pub fn record_cache_hit() {
	#[cfg(feature = "metrics")]
	metrics::counter!("coze_relay_token_cache_hits_total").increment(1);
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn counters_accept_every_flow_without_a_recorder() {
		for kind in [FlowKind::TokenRefresh, FlowKind::Chat] {
			for outcome in [FlowOutcome::Attempt, FlowOutcome::Success, FlowOutcome::Failure] {
				record_flow_outcome(kind, outcome);
			}
		}

		record_cache_hit();
	}
}
