// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"session_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records the outcome of a fallible flow and hands the result back.
pub(crate) fn record_result<T, E>(kind: FlowKind, result: Result<T, E>) -> Result<T, E> {
	let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

	record_flow_outcome(kind, outcome);

	result
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_flow_outcome_noop_without_metrics() {
		record_flow_outcome(FlowKind::Renewal, FlowOutcome::Failure);
	}

	#[test]
	fn record_result_passes_value_through() {
		let ok: Result<u8, ()> = record_result(FlowKind::Dispatch, Ok(7));
		let err: Result<u8, &str> = record_result(FlowKind::Login, Err("bad credentials"));

		assert_eq!(ok, Ok(7));
		assert_eq!(err, Err("bad credentials"));
	}
}
