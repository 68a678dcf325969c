//! Per-user history endpoints: `GET /api/users/{user}/{transactions,quotes,settlements}`.

use axum::extract::{Path, State};
use axum::Json;
use bridge_types::{ApiError, Quote, Settlement, UserTransaction};

use crate::server::AppState;

pub async fn get_user_transactions(
	State(state): State<AppState>,
	Path(user): Path<String>,
) -> Result<Json<Vec<UserTransaction>>, ApiError> {
	Ok(Json(state.engine.get_user_transactions(&user).await?))
}

pub async fn get_user_quotes(
	State(state): State<AppState>,
	Path(user): Path<String>,
) -> Result<Json<Vec<Quote>>, ApiError> {
	Ok(Json(state.engine.get_user_quotes(&user).await?))
}

pub async fn get_user_settlements(
	State(state): State<AppState>,
	Path(user): Path<String>,
) -> Result<Json<Vec<Settlement>>, ApiError> {
	Ok(Json(state.engine.get_user_settlements(&user).await?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::test_support::sample_state;

	#[tokio::test]
	async fn history_endpoints_are_empty_for_a_new_user() {
		let state = sample_state().await;
		let transactions = get_user_transactions(State(state.clone()), Path("alice".to_string()))
			.await
			.unwrap();
		assert!(transactions.0.is_empty());

		let quotes = get_user_quotes(State(state.clone()), Path("alice".to_string()))
			.await
			.unwrap();
		assert!(quotes.0.is_empty());

		let settlements = get_user_settlements(State(state), Path("alice".to_string()))
			.await
			.unwrap();
		assert!(settlements.0.is_empty());
	}
}
