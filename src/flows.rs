//! High-level flows powered by the broker facade.
//!
//! [`Broker`] wires the [`SessionStore`], the [`RefreshCoordinator`], the HTTP transport, and
//! the [`SessionListener`] together. Request dispatch lives in `dispatch`, the renewal driver
//! in `renewal`, and login/logout/password change in `lifecycle`.

mod common;
mod dispatch;
mod lifecycle;
mod renewal;

pub use lifecycle::*;

// self
use crate::{
	_prelude::*,
	api::ApiDescriptor,
	http::{ApiHttpClient, TransportErrorMapper},
	refresh::{RefreshCoordinator, RenewalMetrics},
	signal::{NoopListener, SessionListener},
	store::SessionStore,
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Authenticated API client facade.
///
/// Clones share the store, the coordinator, and the transport, so every clone takes part in
/// the same single-flight renewal.
pub struct Broker<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Session store owning the credentials and identity.
	pub store: Arc<SessionStore>,
	/// API descriptor with the base URL, auth endpoints, and timeouts.
	pub descriptor: ApiDescriptor,
	listener: Arc<dyn SessionListener>,
	coordinator: Arc<RefreshCoordinator>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<SessionStore>,
		descriptor: ApiDescriptor,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			listener: Arc::new(NoopListener),
			coordinator: Default::default(),
		}
	}

	/// Sets or replaces the listener notified of session-state changes.
	pub fn with_listener(mut self, listener: impl 'static + SessionListener) -> Self {
		self.listener = Arc::new(listener);

		self
	}

	/// Shared renewal coordinator.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Renewal counters.
	pub fn renewal_metrics(&self) -> &RenewalMetrics {
		self.coordinator.metrics()
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new broker for the provided store and descriptor.
	///
	/// The broker provisions its own reqwest-backed transport so callers do not need to pass
	/// HTTP handles explicitly.
	pub fn new(store: Arc<SessionStore>, descriptor: ApiDescriptor) -> Self {
		Self::with_http_client(
			store,
			descriptor,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Clone for Broker<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			transport_mapper: self.transport_mapper.clone(),
			store: self.store.clone(),
			descriptor: self.descriptor.clone(),
			listener: self.listener.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("store", &self.store)
			.field("renewal_state", &self.coordinator.state())
			.finish()
	}
}
