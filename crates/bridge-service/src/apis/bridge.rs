//! Settlement endpoints: `POST /api/bridge`, `POST /api/settlements`,
//! `GET /api/settlements/{id}`, `POST /api/payments/icp`.

use axum::extract::{Path, State};
use axum::Json;
use bridge_types::{ApiError, BridgeId, Settlement, UserTransaction};
use serde::Deserialize;

use crate::server::{AppState, CallerId};

#[derive(Debug, Deserialize)]
pub struct BridgeAssetsBody {
	pub amount_wei: u64,
	pub destination_address: String,
	pub destination_chain: String,
}

pub async fn bridge_assets(
	State(state): State<AppState>,
	CallerId(user): CallerId,
	Json(body): Json<BridgeAssetsBody>,
) -> Result<Json<Settlement>, ApiError> {
	let destination_address = super::parse_address(&body.destination_address)?;
	let settlement = state
		.engine
		.bridge_assets(user, body.amount_wei, destination_address, body.destination_chain)
		.await?;
	Ok(Json(settlement))
}

#[derive(Debug, Deserialize)]
pub struct SettleQuoteBody {
	pub quote_id: String,
	pub payment_proof: String,
}

pub async fn settle_quote(
	State(state): State<AppState>,
	Json(body): Json<SettleQuoteBody>,
) -> Result<Json<Settlement>, ApiError> {
	let quote_id: BridgeId = body
		.quote_id
		.parse()
		.map_err(|_| crate::server::bad_request(format!("invalid quote id: {}", body.quote_id)))?;
	let settlement = state.engine.settle_quote(quote_id, body.payment_proof).await?;
	Ok(Json(settlement))
}

pub async fn get_settlement(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Settlement>, ApiError> {
	let id: BridgeId = id
		.parse()
		.map_err(|_| crate::server::bad_request(format!("invalid settlement id: {id}")))?;
	let settlement = state.engine.get_settlement(id).await?;
	Ok(Json(settlement))
}

#[derive(Debug, Deserialize)]
pub struct CreateIcpPaymentBody {
	pub amount_wei: u64,
	pub destination_address: String,
	pub destination_chain: String,
}

pub async fn create_icp_payment(
	State(state): State<AppState>,
	CallerId(user): CallerId,
	Json(body): Json<CreateIcpPaymentBody>,
) -> Result<Json<UserTransaction>, ApiError> {
	let destination_address = super::parse_address(&body.destination_address)?;
	let tx = state
		.engine
		.create_icp_payment(user, body.amount_wei, destination_address, body.destination_chain)
		.await?;
	Ok(Json(tx))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::test_support::sample_state;

	#[tokio::test]
	async fn settle_quote_rejects_a_malformed_quote_id() {
		let state = sample_state().await;
		let err = settle_quote(
			State(state),
			Json(SettleQuoteBody {
				quote_id: "not-a-ulid".to_string(),
				payment_proof: "proof-1".to_string(),
			}),
		)
		.await
		.unwrap_err();
		assert_eq!(err.status, 400);
	}

	#[tokio::test]
	async fn get_settlement_reports_an_error_for_an_unknown_id() {
		let state = sample_state().await;
		let id = bridge_types::BridgeId::generate().to_string();
		let err = get_settlement(State(state), Path(id)).await.unwrap_err();
		assert_eq!(err.status, 500);
	}

	#[tokio::test]
	async fn bridge_assets_rejects_a_malformed_destination_address() {
		let state = sample_state().await;
		let err = bridge_assets(
			State(state),
			CallerId("alice".to_string()),
			Json(BridgeAssetsBody {
				amount_wei: 1_000_000_000_000_000,
				destination_address: "not-an-address".to_string(),
				destination_chain: "base-sepolia".to_string(),
			}),
		)
		.await
		.unwrap_err();
		assert_eq!(err.status, 400);
	}
}
