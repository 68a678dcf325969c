//! HTTP-facing error shape for the API surface.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON body returned for any failed API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
	pub retry_after: Option<u64>,
}

/// Structured API error with HTTP status mapping, constructed from a `BridgeError`.
#[derive(Debug, Clone)]
pub struct ApiError {
	pub status: u16,
	pub error_code: String,
	pub message: String,
	pub retry_after: Option<u64>,
}

impl ApiError {
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.error_code.clone(),
			message: self.message.clone(),
			retry_after: self.retry_after,
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({}): {}", self.error_code, self.status, self.message)
	}
}

impl std::error::Error for ApiError {}

impl From<BridgeError> for ApiError {
	fn from(err: BridgeError) -> Self {
		let status = match &err {
			BridgeError::Validation(_) => 400,
			BridgeError::Quote(crate::error::QuoteError::NotFound(_)) => 404,
			BridgeError::Payment(crate::error::PaymentError::NotFound(_)) => 404,
			BridgeError::Quote(_) | BridgeError::Payment(_) | BridgeError::SettlementNotPending { .. } => 422,
			BridgeError::Reserve(_) => 422,
			BridgeError::Admin(_) => 403,
			BridgeError::Rpc(_) | BridgeError::Signer(_) | BridgeError::Price(_) => 503,
			BridgeError::Config(_) | BridgeError::Internal(_) => 500,
		};
		let retry_after = matches!(
			err,
			BridgeError::Rpc(_) | BridgeError::Signer(_) | BridgeError::Price(_)
		)
		.then_some(5);
		Self {
			status,
			error_code: err.error_code().to_string(),
			message: err.to_string(),
			retry_after,
		}
	}
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::http::StatusCode;
		use axum::Json;

		let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::{QuoteError, ReserveError};

	#[test]
	fn quote_not_found_maps_to_404() {
		let err: BridgeError = QuoteError::NotFound("q1".into()).into();
		let api: ApiError = err.into();
		assert_eq!(api.status, 404);
	}

	#[test]
	fn reserve_error_maps_to_422() {
		let err: BridgeError = ReserveError::Paused.into();
		let api: ApiError = err.into();
		assert_eq!(api.status, 422);
	}
}
