//! Quote Engine: validates a quote request, prices it using the gas
//! estimator and price feed, locks the reserved amount, and persists the
//! resulting `Quote` (validate -> price -> build -> persist, monotonic ids),
//! specialized to this bridge's single source-asset-for-ETH quote.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_gas::{CallKind, GasEstimator};
use bridge_price::PriceFeedService;
use bridge_reserve::ReserveManager;
use bridge_storage::{QueryFilter, StorageService};
use bridge_types::{
	current_timestamp, Address, AuditEntry, BridgeError, BridgeId, Quote, QuoteError, QuoteStatus,
	StorageKey, ValidationError,
};
use tokio::sync::Mutex;
use tracing::info;

const QUOTE_VALIDITY: Duration = Duration::from_secs(15 * 60);

/// Static request parameters validated up front, per §4.5 step 1.
pub struct QuoteRequest {
	pub user: String,
	pub amount_out: u64,
	pub destination_address: Address,
	pub destination_chain: String,
}

pub struct QuoteEngineConfig {
	pub source_asset: String,
	pub source_chain: String,
	pub supported_chains: Vec<String>,
	pub min_quote_amount: u64,
	pub max_quote_amount: u64,
	pub safety_margin_percent: u32,
}

/// Serializes concurrent requests from the same user (§4.5 "Ordering &
/// tie-breaks") via a per-user lock, keyed lazily.
pub struct QuoteEngine {
	config: QuoteEngineConfig,
	gas: Arc<GasEstimator>,
	price: Arc<PriceFeedService>,
	reserve: Arc<ReserveManager>,
	storage: Arc<StorageService>,
	user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl QuoteEngine {
	pub fn new(
		config: QuoteEngineConfig,
		gas: Arc<GasEstimator>,
		price: Arc<PriceFeedService>,
		reserve: Arc<ReserveManager>,
		storage: Arc<StorageService>,
	) -> Self {
		Self {
			config,
			gas,
			price,
			reserve,
			storage,
			user_locks: Mutex::new(HashMap::new()),
		}
	}

	async fn lock_for_user(&self, user: &str) -> Arc<Mutex<()>> {
		let mut locks = self.user_locks.lock().await;
		Arc::clone(
			locks
				.entry(user.to_string())
				.or_insert_with(|| Arc::new(Mutex::new(()))),
		)
	}

	pub async fn request_quote(&self, request: QuoteRequest) -> Result<Quote, BridgeError> {
		let user_lock = self.lock_for_user(&request.user).await;
		let _guard = user_lock.lock().await;

		if !self
			.config
			.supported_chains
			.iter()
			.any(|c| c == &request.destination_chain)
		{
			return Err(ValidationError::UnsupportedChain(request.destination_chain).into());
		}
		if request.amount_out < self.config.min_quote_amount
			|| request.amount_out > self.config.max_quote_amount
		{
			return Err(ValidationError::AmountOutOfRange {
				amount: request.amount_out,
				min: self.config.min_quote_amount,
				max: self.config.max_quote_amount,
			}
			.into());
		}

		let gas_plan = self
			.gas
			.estimate(CallKind::PlainTransfer, QUOTE_VALIDITY)
			.await?;
		let (source_price, eth_price) = self.price.price_pair(&self.config.source_asset).await?;

		let gas_budget = gas_plan.gas_estimate.saturating_mul(gas_plan.max_fee_per_gas);
		let reserved_amount = request.amount_out.saturating_add(gas_budget);

		let total_cost_eth = reserved_amount as f64;
		let total_cost_source = (total_cost_eth * eth_price.price_usd / source_price.price_usd)
			* (1.0 + self.config.safety_margin_percent as f64 / 100.0);
		let total_cost_source = total_cost_source.ceil() as u64;

		self.reserve.lock(reserved_amount).await?;

		let now = current_timestamp();
		let quote = Quote {
			id: BridgeId::generate(),
			user: request.user.clone(),
			amount_requested: total_cost_source,
			amount_out: request.amount_out,
			gas_estimate: gas_plan.gas_estimate,
			base_fee: gas_plan.base_fee,
			priority_fee: gas_plan.priority_fee,
			max_fee_per_gas: gas_plan.max_fee_per_gas,
			safety_margin: self.config.safety_margin_percent as u64,
			total_cost: total_cost_source,
			destination_address: request.destination_address,
			source_chain: self.config.source_chain.clone(),
			destination_chain: request.destination_chain,
			created_at: now,
			expires_at: now + QUOTE_VALIDITY.as_secs(),
			status: QuoteStatus::Active,
		};

		self.storage
			.store(StorageKey::Quotes.as_str(), &quote.id.to_string(), &quote, None)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to persist quote: {e}")))?;

		self.audit("quote_requested", &quote).await;

		info!(quote_id = %quote.id, user = %quote.user, "quote issued");
		Ok(quote)
	}

	/// If `id` is past `expires_at` and still `Active`, marks it `Expired`,
	/// unlocks its reservation, and records an audit entry.
	pub async fn check_expiry(&self, id: BridgeId) -> Result<(), BridgeError> {
		let mut quote: Quote = self
			.storage
			.retrieve(StorageKey::Quotes.as_str(), &id.to_string())
			.await
			.map_err(|_| QuoteError::NotFound(id.to_string()))?;

		if quote.status != QuoteStatus::Active || !quote.is_expired(current_timestamp()) {
			return Ok(());
		}

		quote.status = QuoteStatus::Expired;
		self.reserve.unlock(quote.reserved_amount()).await;
		self.storage
			.update(StorageKey::Quotes.as_str(), &id.to_string(), &quote, None)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to update quote: {e}")))?;

		self.audit("quote_expired", &quote).await;
		Ok(())
	}

	/// Opportunistic sweep, called on every API entry point per §4.5: walks
	/// all active quotes and expires the stale ones.
	pub async fn sweep_expired(&self) -> Result<usize, BridgeError> {
		let active: Vec<(String, Quote)> = self
			.storage
			.query(StorageKey::Quotes.as_str(), QueryFilter::All)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to query quotes: {e}")))?;

		let now = current_timestamp();
		let mut expired = 0;
		for (_, quote) in active {
			if quote.status == QuoteStatus::Active && quote.is_expired(now) {
				self.check_expiry(quote.id).await?;
				expired += 1;
			}
		}
		Ok(expired)
	}

	async fn audit(&self, event_type: &str, quote: &Quote) {
		let entry = AuditEntry::new(event_type, format!("quote {}", quote.id), current_timestamp())
			.with_actor(quote.user.clone())
			.with_amount(quote.total_cost);
		if let Err(e) = self
			.storage
			.store(StorageKey::AuditLog.as_str(), &entry.id.to_string(), &entry, None)
			.await
		{
			tracing::warn!(error = %e, "failed to persist audit entry");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn expiry_window_matches_fifteen_minutes() {
		assert_eq!(QUOTE_VALIDITY.as_secs(), 900);
	}
}
