//! Authenticated request dispatch with a single replay after credential renewal.
//!
//! [`Broker::send`] attaches the current access credential, issues the call, and classifies
//! the answer. A 401 on an ordinary endpoint while a refresh credential is available hands
//! the request to the [`RefreshCoordinator`](crate::refresh::RefreshCoordinator); once a new
//! credential arrives the request is replayed exactly once. A second 401, a 401 with no
//! refresh credential, or a 401 from the login or renewal endpoints is returned as
//! [`Error::AuthExpired`] and never starts a renewal.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	flows::{
		Broker,
		common::{self, Classified},
	},
	http::{ApiHttpClient, ApiRequest, ApiResponse, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sends `request` with the current access credential and returns the 2xx response.
	///
	/// Non-2xx answers other than a recoverable 401 come back as [`Error::Api`]. Requests
	/// issued while no access credential is held go out without an `Authorization` header.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let renewable = self.descriptor.classify(&request.path).allows_renewal();
				let (mut access, generation) = self.store.access_credential();
				let mut retried = false;

				loop {
					let response = common::execute(self, &request, access.as_ref()).await?;
					let error = match common::classify(response) {
						Classified::Success(response) => return Ok(response),
						Classified::Failed(error) => return Err(error.into()),
						Classified::AuthExpired(error) => error,
					};

					if retried || !renewable || self.store.refresh_credential().is_none() {
						return Err(common::hard_auth_failure(error));
					}

					retried = true;
					access = Some(self.await_renewal(request.label(), generation).await?);

					obs::replaying(&request.label());
				}
			})
			.await;

		obs::record_result(KIND, result)
	}

	/// Sends `request` and decodes the 2xx JSON body into `T`.
	pub async fn send_json<T>(&self, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let path = request.path.clone();
		let response = self.send(request).await?;

		Ok(response.json(&path)?)
	}
}
