//! HTTP server for the bridge API: one `AppState`, one `/api`-nested
//! `Router`, a thin CORS layer, a `TcpListener` bind, `axum::serve`.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use bridge_types::ApiError;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::apis;
use crate::engine::BridgeEngine;

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<BridgeEngine>,
}

/// Derives the caller's identity from the `X-User-Id` header. Stands in for
/// the host platform's caller-identity mechanism (§4.11): an IC canister
/// reads `ic_cdk::caller()`, an HTTP deployment reads a header set by
/// whatever gateway or auth proxy sits in front of it.
pub struct CallerId(pub String);

impl<S> FromRequestParts<S> for CallerId
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.headers
			.get("x-user-id")
			.and_then(|v| v.to_str().ok())
			.filter(|v| !v.is_empty())
			.map(|v| CallerId(v.to_string()))
			.ok_or_else(|| ApiError {
				status: 401,
				error_code: "missing_caller_identity".to_string(),
				message: "request is missing the X-User-Id header".to_string(),
				retry_after: None,
			})
	}
}

pub async fn start_server(
	host: &str,
	port: u16,
	engine: Arc<BridgeEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let cors = engine
		.config
		.api
		.as_ref()
		.and_then(|api| api.cors.as_ref())
		.map(|cors| {
			let origins: Result<Vec<_>, _> = cors
				.allowed_origins
				.iter()
				.map(|o| o.parse::<axum::http::HeaderValue>())
				.collect();
			origins
				.map(|origins| CorsLayer::new().allow_origin(origins).allow_methods(tower_http::cors::Any))
				.unwrap_or_else(|_| CorsLayer::permissive())
		})
		.unwrap_or_else(CorsLayer::permissive);

	let state = AppState { engine };

	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/quotes", post(apis::quote::request_quote))
				.route("/quotes/{id}", get(apis::quote::get_quote))
				.route("/bridge", post(apis::bridge::bridge_assets))
				.route("/settlements", post(apis::bridge::settle_quote))
				.route("/settlements/{id}", get(apis::bridge::get_settlement))
				.route("/payments/icp", post(apis::bridge::create_icp_payment))
				.route("/users/{user}/transactions", get(apis::user::get_user_transactions))
				.route("/users/{user}/quotes", get(apis::user::get_user_quotes))
				.route("/users/{user}/settlements", get(apis::user::get_user_settlements))
				.route("/sponsorship", get(apis::status::get_sponsorship_status))
				.route("/reserve", get(apis::status::get_detailed_reserve_status))
				.route("/stats", get(apis::status::get_bridge_statistics))
				.route("/prices", get(apis::status::get_price_feed_status))
				.route("/config", get(apis::status::get_config))
				.route("/admin/admins", post(apis::admin::add_admin))
				.route("/admin/reserve/funds", post(apis::admin::add_reserve_funds))
				.route("/admin/reserve/daily-limit", post(apis::admin::set_daily_limit))
				.route("/admin/reserve/thresholds", post(apis::admin::set_reserve_thresholds))
				.route("/admin/pause", post(apis::admin::emergency_pause))
				.route("/admin/unpause", post(apis::admin::emergency_unpause))
				.route("/admin/config", post(apis::admin::update_config))
				.route("/cache/rpc/clear", post(apis::admin::clear_rpc_cache))
				.route("/cache/gas/invalidate", post(apis::admin::invalidate_gas_cache))
				.route("/cache/rpc/stats", get(apis::admin::get_rpc_cache_stats)),
		)
		.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
		.with_state(state);

	let bind_address = format!("{host}:{port}");
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("bridge API server starting on {}", bind_address);
	axum::serve(listener, app).await?;

	Ok(())
}

pub(crate) fn bad_request(message: impl Into<String>) -> ApiError {
	ApiError {
		status: StatusCode::BAD_REQUEST.as_u16(),
		error_code: "bad_request".to_string(),
		message: message.into(),
		retry_after: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::http::Request;

	async fn extract_caller_id(header: Option<&str>) -> Result<CallerId, ApiError> {
		let mut builder = Request::builder().uri("/");
		if let Some(value) = header {
			builder = builder.header("x-user-id", value);
		}
		let request = builder.body(()).unwrap();
		let (mut parts, ()) = request.into_parts();
		CallerId::from_request_parts(&mut parts, &()).await
	}

	#[tokio::test]
	async fn caller_id_reads_the_header() {
		let CallerId(user) = extract_caller_id(Some("alice")).await.unwrap();
		assert_eq!(user, "alice");
	}

	#[tokio::test]
	async fn caller_id_rejects_a_missing_header() {
		let err = extract_caller_id(None).await.unwrap_err();
		assert_eq!(err.status, 401);
		assert_eq!(err.error_code, "missing_caller_identity");
	}

	#[tokio::test]
	async fn caller_id_rejects_an_empty_header() {
		let err = extract_caller_id(Some("")).await.unwrap_err();
		assert_eq!(err.status, 401);
	}
}
