//! Quote endpoints: `POST /api/quotes`, `GET /api/quotes/{id}`.

use axum::extract::{Path, State};
use axum::Json;
use bridge_types::{ApiError, BridgeId, Quote};
use serde::Deserialize;

use crate::server::{AppState, CallerId};

#[derive(Debug, Deserialize)]
pub struct RequestQuoteBody {
	pub amount_wei: u64,
	pub destination_address: String,
	pub destination_chain: String,
}

pub async fn request_quote(
	State(state): State<AppState>,
	CallerId(user): CallerId,
	Json(body): Json<RequestQuoteBody>,
) -> Result<Json<Quote>, ApiError> {
	let destination_address = super::parse_address(&body.destination_address)?;
	let quote = state
		.engine
		.request_quote(user, body.amount_wei, destination_address, body.destination_chain)
		.await?;
	Ok(Json(quote))
}

pub async fn get_quote(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Quote>, ApiError> {
	let id: BridgeId = id
		.parse()
		.map_err(|_| crate::server::bad_request(format!("invalid quote id: {id}")))?;
	let quote = state.engine.get_quote(id).await?;
	Ok(Json(quote))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::test_support::sample_state;

	#[tokio::test]
	async fn get_quote_rejects_a_malformed_id() {
		let state = sample_state().await;
		let err = get_quote(State(state), Path("not-a-ulid".to_string()))
			.await
			.unwrap_err();
		assert_eq!(err.status, 400);
	}

	#[tokio::test]
	async fn get_quote_reports_404_for_an_unknown_id() {
		let state = sample_state().await;
		let id = bridge_types::BridgeId::generate().to_string();
		let err = get_quote(State(state), Path(id)).await.unwrap_err();
		assert_eq!(err.status, 404);
	}
}
