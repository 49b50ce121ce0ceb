// self
use crate::{
	_prelude::*,
	error::TerminalReason,
	http::RequestLabel,
	obs::FlowKind,
	signal::LogoutReason,
	store::StoreError,
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by broker flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("session_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
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

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

pub(crate) fn persistence_failed(operation: &'static str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, error = %error, "Session persistence failed; in-memory state kept.");
	#[cfg(not(feature = "tracing"))]
	let _ = (operation, error);
}

pub(crate) fn waiter_enqueued(request: &RequestLabel, position: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(request = %request, position, "Queued behind in-flight renewal.");
	#[cfg(not(feature = "tracing"))]
	let _ = (request, position);
}

pub(crate) fn stale_credential(request: &RequestLabel, observed: u64, current: u64) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		request = %request,
		observed,
		current,
		"Credential already replaced; skipping renewal."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (request, observed, current);
}

pub(crate) fn renewal_succeeded(fingerprint: &str, waiters: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(access = fingerprint, waiters, "Renewal succeeded; waiters resolved.");
	#[cfg(not(feature = "tracing"))]
	let _ = (fingerprint, waiters);
}

pub(crate) fn renewal_failed(reason: TerminalReason, waiters: usize) {
	#[cfg(feature = "tracing")]
	tracing::warn!(reason = reason.as_str(), waiters, "Renewal failed; waiters rejected.");
	#[cfg(not(feature = "tracing"))]
	let _ = (reason, waiters);
}

pub(crate) fn renewal_reopened(waiters: usize) {
	#[cfg(feature = "tracing")]
	tracing::debug!(waiters, "Renewal driver went away; reopening the cycle.");
	#[cfg(not(feature = "tracing"))]
	let _ = waiters;
}

pub(crate) fn replaying(request: &RequestLabel) {
	#[cfg(feature = "tracing")]
	tracing::debug!(request = %request, "Replaying request with renewed credential.");
	#[cfg(not(feature = "tracing"))]
	let _ = request;
}

pub(crate) fn session_cleared(reason: LogoutReason) {
	#[cfg(feature = "tracing")]
	tracing::info!(reason = reason.as_str(), "Session cleared.");
	#[cfg(not(feature = "tracing"))]
	let _ = reason;
}
