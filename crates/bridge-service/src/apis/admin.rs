//! Admin and cache-management endpoints. Every handler here resolves the
//! caller's identity and lets `BridgeEngine` enforce admin membership
//! (§4.11): a non-admin caller gets `BridgeError::Admin(AdminError::NotAdmin)`
//! mapped to a 403, same as every other error path.

use axum::extract::State;
use axum::Json;
use bridge_types::{ApiError, RpcEndpoint};
use serde::{Deserialize, Serialize};

use crate::server::{AppState, CallerId};

#[derive(Debug, Deserialize)]
pub struct AddAdminBody {
	pub new_admin: String,
}

pub async fn add_admin(
	State(state): State<AppState>,
	CallerId(actor): CallerId,
	Json(body): Json<AddAdminBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
	state.engine.add_admin(&actor, body.new_admin).await?;
	Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct AmountBody {
	pub amount: u64,
}

pub async fn add_reserve_funds(
	State(state): State<AppState>,
	CallerId(actor): CallerId,
	Json(body): Json<AmountBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
	state.engine.admin_add_reserve_funds(&actor, body.amount).await?;
	Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct DailyLimitBody {
	pub limit: u64,
}

pub async fn set_daily_limit(
	State(state): State<AppState>,
	CallerId(actor): CallerId,
	Json(body): Json<DailyLimitBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
	state.engine.admin_set_daily_limit(&actor, body.limit).await?;
	Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ThresholdsBody {
	pub warning: u64,
	pub critical: u64,
}

pub async fn set_reserve_thresholds(
	State(state): State<AppState>,
	CallerId(actor): CallerId,
	Json(body): Json<ThresholdsBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
	state
		.engine
		.admin_set_reserve_thresholds(&actor, body.warning, body.critical)
		.await?;
	Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn emergency_pause(
	State(state): State<AppState>,
	CallerId(actor): CallerId,
) -> Result<Json<serde_json::Value>, ApiError> {
	state.engine.admin_emergency_pause(&actor).await?;
	Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn emergency_unpause(
	State(state): State<AppState>,
	CallerId(actor): CallerId,
) -> Result<Json<serde_json::Value>, ApiError> {
	state.engine.admin_emergency_unpause(&actor).await?;
	Ok(Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateConfigBody {
	pub toml: String,
}

pub async fn update_config(
	State(state): State<AppState>,
	CallerId(actor): CallerId,
	Json(body): Json<UpdateConfigBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
	state.engine.update_config(&actor, body.toml).await?;
	Ok(Json(serde_json::json!({ "ok": true })))
}

pub async fn clear_rpc_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
	state.engine.clear_rpc_cache().await;
	Json(serde_json::json!({ "ok": true }))
}

pub async fn invalidate_gas_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
	state.engine.invalidate_gas_cache().await;
	Json(serde_json::json!({ "ok": true }))
}

#[derive(Debug, Serialize)]
pub struct RpcCacheStatsResponse {
	pub cache_hits: u64,
	pub cache_misses: u64,
	pub cache_hit_ratio: f64,
	pub endpoints: Vec<RpcEndpoint>,
	pub last_seen_block: Option<u64>,
}

pub async fn get_rpc_cache_stats(State(state): State<AppState>) -> Json<RpcCacheStatsResponse> {
	let stats = state.engine.get_rpc_cache_stats().await;
	Json(RpcCacheStatsResponse {
		cache_hits: stats.cache_hits,
		cache_misses: stats.cache_misses,
		cache_hit_ratio: stats.cache_hit_ratio,
		endpoints: stats.endpoints,
		last_seen_block: stats.last_seen_block,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::test_support::sample_state;

	#[tokio::test]
	async fn non_admin_caller_is_rejected_with_403() {
		let state = sample_state().await;
		let err = add_admin(
			State(state),
			CallerId("nobody".to_string()),
			Json(AddAdminBody {
				new_admin: "deputy".to_string(),
			}),
		)
		.await
		.unwrap_err();
		assert_eq!(err.status, 403);
		assert_eq!(err.error_code, "not_admin");
	}

	#[tokio::test]
	async fn bootstrap_admin_can_add_funds_and_pause() {
		let state = sample_state().await;

		add_reserve_funds(
			State(state.clone()),
			CallerId("root-admin".to_string()),
			Json(AmountBody { amount: 500 }),
		)
		.await
		.unwrap();

		emergency_pause(State(state.clone()), CallerId("root-admin".to_string()))
			.await
			.unwrap();
		let status = state.engine.get_detailed_reserve_status().await;
		assert!(status.reserve.paused);
		assert_eq!(status.reserve.balance, 50000000000000000500);

		emergency_unpause(State(state), CallerId("root-admin".to_string()))
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn cache_endpoints_report_a_cold_cache() {
		let state = sample_state().await;
		let stats = get_rpc_cache_stats(State(state)).await;
		assert_eq!(stats.0.cache_hits, 0);
	}
}
