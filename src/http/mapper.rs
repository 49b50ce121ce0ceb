// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts a transport failure observed while calling `endpoint` into a broker error.
	///
	/// Timeouts must map to [`TransportError::Timeout`] so a timed-out renewal is classified
	/// as a terminal timeout rather than a generic transport failure.
	fn map_transport_error(&self, endpoint: &str, error: E) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, endpoint: &str, err: ReqwestError) -> Error {
		if err.is_builder() {
			return ConfigError::from(err).into();
		}
		if err.is_timeout() {
			return TransportError::timeout(endpoint, err).into();
		}

		TransportError::network(endpoint, err).into()
	}
}
