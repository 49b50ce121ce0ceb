//! Driving one renewal cycle against the renewal endpoint.

// self
use crate::{
	_prelude::*,
	auth::CredentialSecret,
	error::{TerminalAuthError, TerminalReason},
	flows::{Broker, common},
	http::{ApiHttpClient, ApiRequest, RequestLabel, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::{RenewalDriver, Settlement, Ticket},
	signal::LogoutReason,
	store::AccessUpdate,
};

#[derive(Serialize)]
struct RenewalBody<'a> {
	refresh_token: &'a str,
}

#[derive(Deserialize)]
struct RenewalResponse {
	access_token: CredentialSecret,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Reports an auth-expired answer for `request` and resolves to the credential to retry with.
	///
	/// A waiter whose driver went away reports again, so one of the released waiters takes
	/// over the renewal instead of failing.
	pub(crate) async fn await_renewal(
		&self,
		request: RequestLabel,
		observed_generation: u64,
	) -> Result<CredentialSecret> {
		loop {
			match self.coordinator.begin(request.clone(), observed_generation, &self.store) {
				Ticket::Fresh(access) => return Ok(access),
				Ticket::Rejected(error) => return Err(error.into()),
				Ticket::Drive(driver) => return self.drive_renewal(driver).await,
				Ticket::Wait(handle) => match handle.wait().await {
					Settlement::Settled(outcome) => return Ok(outcome?),
					Settlement::Reopened => continue,
				},
			}
		}
	}

	async fn drive_renewal(&self, driver: RenewalDriver<'_>) -> Result<CredentialSecret> {
		const KIND: FlowKind = FlowKind::Renewal;

		let span = FlowSpan::new(KIND, "drive_renewal");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let refresh = driver.refresh_credential().clone();
				let access = match self.request_renewal(&refresh).await {
					Ok(access) => access,
					Err(e) => {
						let error = TerminalAuthError::from_renewal_error(&e);

						driver.fail(&error, || {
							self.force_logout(LogoutReason::RenewalFailed);
						});

						return Err(error.into());
					},
				};

				match self.store.compare_and_set_access(&refresh, access.clone()) {
					AccessUpdate::Updated => {
						driver.succeed(&access);

						Ok(access)
					},
					// A new login replaced the session mid-flight; its credential wins.
					AccessUpdate::RefreshMismatch => match self.store.access_credential().0 {
						Some(current) => {
							driver.succeed(&current);

							Ok(current)
						},
						None => Err(Self::end_cycle(driver)),
					},
					AccessUpdate::LoggedOut => Err(Self::end_cycle(driver)),
				}
			})
			.await;

		obs::record_result(KIND, result)
	}

	/// `POST {refresh_token}` to the renewal endpoint, bounded by the renewal timeout.
	async fn request_renewal(&self, refresh: &CredentialSecret) -> Result<CredentialSecret> {
		let request = ApiRequest::post(self.descriptor.endpoints.refresh.as_str())
			.json(&RenewalBody { refresh_token: refresh.expose() })?
			.timeout(self.descriptor.renewal_timeout);
		let response = common::execute(self, &request, None).await?;
		let response = common::expect_success(response)?;
		let body: RenewalResponse = response.json(&request.path)?;

		Ok(body.access_token)
	}

	fn end_cycle(driver: RenewalDriver<'_>) -> Error {
		let error = TerminalAuthError::new(
			TerminalReason::SessionEnded,
			"The session was logged out while its credential was being renewed",
		);

		driver.fail(&error, || {});

		error.into()
	}
}
