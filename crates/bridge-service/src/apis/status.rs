//! Read-only status endpoints: sponsorship estimate, reserve, aggregate
//! statistics, price feed snapshot, and the redacted running configuration.

use axum::extract::{Query, State};
use axum::Json;
use bridge_config::BridgeConfig;
use bridge_types::ApiError;
use serde::Deserialize;

use crate::engine::{BridgeStatistics, PriceFeedStatus, ReserveStatus, SponsorshipStatus};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SponsorshipQuery {
	pub amount_wei: u64,
	pub destination_chain: String,
}

pub async fn get_sponsorship_status(
	State(state): State<AppState>,
	Query(query): Query<SponsorshipQuery>,
) -> Result<Json<SponsorshipStatus>, ApiError> {
	let status = state
		.engine
		.get_sponsorship_status(query.amount_wei, &query.destination_chain)
		.await?;
	Ok(Json(status))
}

pub async fn get_detailed_reserve_status(State(state): State<AppState>) -> Json<ReserveStatus> {
	Json(state.engine.get_detailed_reserve_status().await)
}

pub async fn get_bridge_statistics(
	State(state): State<AppState>,
) -> Result<Json<BridgeStatistics>, ApiError> {
	Ok(Json(state.engine.get_bridge_statistics().await?))
}

pub async fn get_price_feed_status(
	State(state): State<AppState>,
) -> Result<Json<PriceFeedStatus>, ApiError> {
	Ok(Json(state.engine.get_price_feed_status().await?))
}

pub async fn get_config(State(state): State<AppState>) -> Json<BridgeConfig> {
	Json(state.engine.get_config())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::test_support::sample_state;

	#[tokio::test]
	async fn get_config_never_leaks_the_raw_signer_config() {
		let state = sample_state().await;
		let config = get_config(State(state)).await;
		assert_eq!(
			config.0.signer.config,
			toml::Value::String("***redacted***".to_string())
		);
	}

	#[tokio::test]
	async fn get_detailed_reserve_status_reflects_the_seeded_reserve() {
		let state = sample_state().await;
		let status = get_detailed_reserve_status(State(state)).await;
		assert_eq!(status.0.reserve.balance, 50000000000000000000);
		assert!(!status.0.reserve.paused);
	}

	#[tokio::test]
	async fn get_bridge_statistics_starts_empty() {
		let state = sample_state().await;
		let stats = get_bridge_statistics(State(state)).await.unwrap();
		assert_eq!(stats.0.total_quotes, 0);
	}

	#[tokio::test]
	async fn get_sponsorship_status_rejects_an_unsupported_chain() {
		let state = sample_state().await;
		let err = get_sponsorship_status(
			State(state),
			Query(SponsorshipQuery {
				amount_wei: 1_000_000_000_000_000,
				destination_chain: "not-a-chain".to_string(),
			}),
		)
		.await
		.unwrap_err();
		assert_eq!(err.status, 400);
	}
}
