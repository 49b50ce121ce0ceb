//! Shared helpers for flow implementations (transport execution, response classification).

// self
use crate::{
	_prelude::*,
	auth::CredentialSecret,
	error::ApiError,
	flows::Broker,
	http::{ApiHttpClient, ApiRequest, ApiResponse, TransportErrorMapper},
};

const UNAUTHORIZED: u16 = 401;

/// Outcome of a completed HTTP exchange as seen by the dispatcher.
#[derive(Debug)]
pub(crate) enum Classified {
	/// 2xx.
	Success(ApiResponse),
	/// 401; the access credential was rejected.
	AuthExpired(ApiError),
	/// Any other non-2xx status.
	Failed(ApiError),
}

/// Sends `request` with `bearer` attached and maps transport failures into broker errors.
pub(crate) async fn execute<C, M>(
	broker: &Broker<C, M>,
	request: &ApiRequest,
	bearer: Option<&CredentialSecret>,
) -> Result<ApiResponse>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let http_request = request.to_http(&broker.descriptor, bearer)?;
	let timeout = request.effective_timeout(&broker.descriptor);
	let response = broker
		.http_client
		.execute(http_request, timeout)
		.await
		.map_err(|e| broker.transport_mapper.map_transport_error(&request.path, e))?;

	Ok(ApiResponse::from(response))
}

pub(crate) fn classify(response: ApiResponse) -> Classified {
	if response.is_success() {
		return Classified::Success(response);
	}

	let error = api_error(response);

	if error.status == UNAUTHORIZED { Classified::AuthExpired(error) } else { Classified::Failed(error) }
}

/// Classifies a response from an endpoint that never goes through renewal.
pub(crate) fn expect_success(response: ApiResponse) -> Result<ApiResponse> {
	match classify(response) {
		Classified::Success(response) => Ok(response),
		Classified::AuthExpired(error) => Err(hard_auth_failure(error)),
		Classified::Failed(error) => Err(error.into()),
	}
}

pub(crate) fn hard_auth_failure(error: ApiError) -> Error {
	let message = error.message.unwrap_or_else(|| "opaque error body".into());

	Error::AuthExpired { message }
}

fn api_error(response: ApiResponse) -> ApiError {
	ApiError { status: response.status, message: error_message(&response.body), body: response.body }
}

/// Extracts the message of an `{"error": "..."}` body.
fn error_message(body: &[u8]) -> Option<String> {
	#[derive(Deserialize)]
	struct ErrorBody {
		error: String,
	}

	serde_json::from_slice::<ErrorBody>(body).ok().map(|body| body.error)
}
