//! Wires every component crate into one owned value. Handlers receive it by
//! reference rather than reaching into global state.

use std::collections::HashMap;
use std::sync::Arc;

use bridge_config::BridgeConfig;
use bridge_gas::{CallKind, GasEstimator};
use bridge_payment::{PaymentVerifier, SourceLedgerInterface, StorageBackedLedger};
use bridge_price::PriceFeedService;
use bridge_quote::{QuoteEngine, QuoteEngineConfig, QuoteRequest};
use bridge_reserve::ReserveManager;
use bridge_rpc::{RpcClient, RpcStats};
use bridge_settlement::{SettlementEngine, SettlementEngineConfig};
use bridge_signer::SignerService;
use bridge_storage::{QueryFilter, StorageService};
use bridge_types::{
	current_timestamp, AdminError, Address, AuditEntry, BridgeError, BridgeId, ConfigError, Quote,
	QuoteStatus, Reserve, ReserveHealth, Settlement, SettlementStatus, StorageKey, UserTransaction,
	UserTransactionStatus,
};
use serde::Serialize;
use tracing::info;

const ADMIN_SET_ID: &str = "set";
const QUOTE_VALIDITY: std::time::Duration = std::time::Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Serialize)]
pub struct SponsorshipStatus {
	pub can_sponsor: bool,
	pub estimated_cost_eth: u64,
	pub estimated_cost_source: u64,
	/// Fraction of the requested gas budget the reserve can currently cover,
	/// capped at 1.0.
	pub gas_coverage: f64,
	pub reserve_health: ReserveHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReserveStatus {
	pub reserve: Reserve,
	pub health: ReserveHealth,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct BridgeStatistics {
	pub total_quotes: usize,
	pub active_quotes: usize,
	pub settled_quotes: usize,
	pub expired_quotes: usize,
	pub total_settlements: usize,
	pub pending_settlements: usize,
	pub completed_settlements: usize,
	pub failed_settlements: usize,
	pub total_user_transactions: usize,
	pub reserve_available: u64,
	pub reserve_health: Option<ReserveHealth>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceFeedStatus {
	pub source: bridge_types::PriceData,
	pub eth: bridge_types::PriceData,
}

/// The fully wired bridge: one owned value holding every component, built
/// once at startup by `bootstrap` and shared behind an `Arc` with the HTTP
/// layer and the background expiry sweep.
pub struct BridgeEngine {
	pub config: BridgeConfig,
	pub storage: Arc<StorageService>,
	pub rpc: Arc<RpcClient>,
	pub price: Arc<PriceFeedService>,
	pub gas: Arc<GasEstimator>,
	pub reserve: Arc<ReserveManager>,
	pub signer: Arc<SignerService>,
	pub payment: Arc<PaymentVerifier>,
	pub ledger: Arc<StorageBackedLedger>,
	pub quote: Arc<QuoteEngine>,
	pub settlement: Arc<SettlementEngine>,
}

impl BridgeEngine {
	pub async fn bootstrap(config: BridgeConfig) -> Result<Arc<Self>, BridgeError> {
		let storage = Arc::new(build_storage(&config)?);
		bootstrap_admins(&storage, &config.bridge.bootstrap_admin).await?;

		let chain = config
			.supported_chains
			.first()
			.ok_or_else(|| ConfigError::Validation("no supported_chains configured".into()))?
			.clone();

		let rpc = RpcClient::new(chain.rpc_urls.clone()).map_err(BridgeError::from)?;
		let rpc = Arc::new(rpc);

		let gas = Arc::new(GasEstimator::new(
			(*rpc).clone(),
			config.quote.safety_margin_percent as u32,
		));

		let price = Arc::new(build_price_feed(&config)?);

		let reserve = Arc::new(ReserveManager::new(
			load_or_init_reserve(&storage, &config).await?,
		));

		let signer = Arc::new(build_signer(&config)?);

		let ledger = Arc::new(StorageBackedLedger::new(storage.interface()));
		let payment = Arc::new(PaymentVerifier::new(
			ledger.clone() as Arc<dyn SourceLedgerInterface>,
			storage.interface(),
		));

		let quote = Arc::new(QuoteEngine::new(
			QuoteEngineConfig {
				source_asset: source_asset_name(&config),
				source_chain: config.bridge.source_chain.clone(),
				supported_chains: config.supported_chains.iter().map(|c| c.name.clone()).collect(),
				min_quote_amount: config.quote.min_quote_amount,
				max_quote_amount: config.quote.max_quote_amount,
				safety_margin_percent: config.quote.safety_margin_percent as u32,
			},
			gas.clone(),
			price.clone(),
			reserve.clone(),
			storage.clone(),
		));

		let settlement = Arc::new(SettlementEngine::new(
			SettlementEngineConfig {
				chain_id: chain.chain_id,
			},
			payment.clone(),
			signer.clone(),
			rpc.clone(),
			reserve.clone(),
			gas.clone(),
			storage.clone(),
		));

		info!(bridge_id = %config.bridge.id, chain = %chain.name, "bridge engine ready");

		Ok(Arc::new(Self {
			config,
			storage,
			rpc,
			price,
			gas,
			reserve,
			signer,
			payment,
			ledger,
			quote,
			settlement,
		}))
	}

	// -- admin membership --------------------------------------------------

	pub async fn is_admin(&self, user: &str) -> bool {
		let admins: Vec<String> = self
			.storage
			.retrieve(StorageKey::Admins.as_str(), ADMIN_SET_ID)
			.await
			.unwrap_or_default();
		admins.iter().any(|a| a == user)
	}

	pub async fn add_admin(&self, actor: &str, new_admin: String) -> Result<(), BridgeError> {
		if !self.is_admin(actor).await {
			return Err(AdminError::NotAdmin.into());
		}
		let mut admins: Vec<String> = self
			.storage
			.retrieve(StorageKey::Admins.as_str(), ADMIN_SET_ID)
			.await
			.unwrap_or_default();
		if !admins.iter().any(|a| a == &new_admin) {
			admins.push(new_admin.clone());
			self.storage
				.store(StorageKey::Admins.as_str(), ADMIN_SET_ID, &admins, None)
				.await
				.map_err(|e| BridgeError::Internal(format!("failed to persist admins: {e}")))?;
		}
		self.audit("admin_added", Some(actor.to_string()), None)
			.await;
		Ok(())
	}

	// -- core flows ----------------------------------------------------------

	pub async fn request_quote(
		&self,
		user: String,
		amount_out: u64,
		destination_address: Address,
		destination_chain: String,
	) -> Result<Quote, BridgeError> {
		self.quote.sweep_expired().await?;
		self.quote
			.request_quote(QuoteRequest {
				user,
				amount_out,
				destination_address,
				destination_chain,
			})
			.await
	}

	pub async fn settle_quote(
		&self,
		quote_id: BridgeId,
		payment_proof: String,
	) -> Result<Settlement, BridgeError> {
		self.quote.sweep_expired().await?;
		self.settlement.bridge_assets(quote_id, payment_proof).await
	}

	/// Combined flow (§6 `bridge_assets`): issues a quote and drives the
	/// settlement inline, recording a ledger transfer on the caller's behalf
	/// so `settle_quote`'s payment verification has a proof to check against.
	pub async fn bridge_assets(
		&self,
		user: String,
		amount_out: u64,
		destination_address: Address,
		destination_chain: String,
	) -> Result<Settlement, BridgeError> {
		let quote = self
			.request_quote(user.clone(), amount_out, destination_address, destination_chain)
			.await?;
		let payment_proof = self.record_linked_payment(&user, quote.total_cost).await?;
		self.settle_quote(quote.id, payment_proof).await
	}

	/// `create_icp_payment` (§6): same combined flow, but returns the
	/// higher-level `UserTransaction` record a source-chain-paid caller polls.
	pub async fn create_icp_payment(
		&self,
		user: String,
		amount_out: u64,
		destination_address: Address,
		destination_chain: String,
	) -> Result<UserTransaction, BridgeError> {
		let quote = self
			.request_quote(user.clone(), amount_out, destination_address, destination_chain)
			.await?;
		let payment_proof = self.record_linked_payment(&user, quote.total_cost).await?;
		let settlement = self.settle_quote(quote.id, payment_proof.clone()).await;

		let (status, settlement_id) = match &settlement {
			Ok(s) if s.status == SettlementStatus::Completed => (UserTransactionStatus::Completed, Some(s.id)),
			Ok(s) => (UserTransactionStatus::Processing, Some(s.id)),
			Err(_) => (UserTransactionStatus::Failed, None),
		};

		let tx = UserTransaction {
			id: BridgeId::generate(),
			user,
			icp_payment_id: payment_proof,
			settlement_id,
			amount_source: quote.total_cost,
			amount_eth: quote.amount_out,
			gas_sponsored: quote.gas_budget(),
			status,
			created_at: current_timestamp(),
		};
		self.storage
			.store(
				StorageKey::UserTransactions.as_str(),
				&tx.id.to_string(),
				&tx,
				None,
			)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to record user transaction: {e}")))?;

		settlement.map_err(|e| {
			tracing::warn!(error = %e, "create_icp_payment settlement leg failed, transaction recorded as failed");
			e
		})?;
		Ok(tx)
	}

	/// Records a finalized transfer in the in-process source ledger under a
	/// freshly generated proof id, standing in for an externally verified
	/// source-chain payment (§4.6 "external collaborator").
	async fn record_linked_payment(&self, user: &str, amount: u64) -> Result<String, BridgeError> {
		let proof_id = BridgeId::generate().to_string();
		self.ledger
			.record_transfer(bridge_payment::LedgerTransfer {
				proof_id: proof_id.clone(),
				from: user.to_string(),
				to: self.config.bridge.id.clone(),
				amount,
				finalized: true,
			})
			.await?;
		Ok(proof_id)
	}

	// -- lookups ---------------------------------------------------------

	pub async fn get_quote(&self, id: BridgeId) -> Result<Quote, BridgeError> {
		self.storage
			.retrieve(StorageKey::Quotes.as_str(), &id.to_string())
			.await
			.map_err(|_| bridge_types::QuoteError::NotFound(id.to_string()).into())
	}

	pub async fn get_settlement(&self, id: BridgeId) -> Result<Settlement, BridgeError> {
		self.storage
			.retrieve(StorageKey::Settlements.as_str(), &id.to_string())
			.await
			.map_err(|_| BridgeError::Internal(format!("settlement {id} not found")))
	}

	pub async fn get_user_quotes(&self, user: &str) -> Result<Vec<Quote>, BridgeError> {
		let all: Vec<(String, Quote)> = self
			.storage
			.query(StorageKey::Quotes.as_str(), QueryFilter::All)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to query quotes: {e}")))?;
		Ok(all.into_iter().map(|(_, q)| q).filter(|q| q.user == user).collect())
	}

	pub async fn get_user_settlements(&self, user: &str) -> Result<Vec<Settlement>, BridgeError> {
		let all: Vec<(String, Settlement)> = self
			.storage
			.query(StorageKey::Settlements.as_str(), QueryFilter::All)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to query settlements: {e}")))?;
		Ok(all.into_iter().map(|(_, s)| s).filter(|s| s.user == user).collect())
	}

	pub async fn get_user_transactions(&self, user: &str) -> Result<Vec<UserTransaction>, BridgeError> {
		let all: Vec<(String, UserTransaction)> = self
			.storage
			.query(StorageKey::UserTransactions.as_str(), QueryFilter::All)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to query user transactions: {e}")))?;
		Ok(all.into_iter().map(|(_, t)| t).filter(|t| t.user == user).collect())
	}

	// -- status & stats ----------------------------------------------------

	pub async fn get_sponsorship_status(
		&self,
		amount_out: u64,
		destination_chain: &str,
	) -> Result<SponsorshipStatus, BridgeError> {
		if !self
			.config
			.supported_chains
			.iter()
			.any(|c| c.name == destination_chain)
		{
			return Err(bridge_types::ValidationError::UnsupportedChain(destination_chain.to_string()).into());
		}

		let gas_plan = self.gas.estimate(CallKind::PlainTransfer, QUOTE_VALIDITY).await?;
		let (source_price, eth_price) = self.price.price_pair(&source_asset_name(&self.config)).await?;

		let gas_budget = gas_plan.gas_estimate.saturating_mul(gas_plan.max_fee_per_gas);
		let reserved_amount = amount_out.saturating_add(gas_budget);
		let estimated_cost_source = ((reserved_amount as f64 * eth_price.price_usd / source_price.price_usd)
			* (1.0 + self.config.quote.safety_margin_percent as f64 / 100.0))
			.ceil() as u64;

		let reserve = self.reserve.snapshot().await;
		let can_sponsor =
			!reserve.paused && reserve.available() >= reserved_amount && reserve.daily_used < reserve.daily_limit;
		let gas_coverage = if gas_budget == 0 {
			1.0
		} else {
			(reserve.available() as f64 / gas_budget as f64).min(1.0)
		};

		Ok(SponsorshipStatus {
			can_sponsor,
			estimated_cost_eth: reserved_amount,
			estimated_cost_source,
			gas_coverage,
			reserve_health: reserve.health(),
		})
	}

	pub async fn get_detailed_reserve_status(&self) -> ReserveStatus {
		let reserve = self.reserve.snapshot().await;
		let health = reserve.health();
		ReserveStatus { reserve, health }
	}

	pub async fn get_bridge_statistics(&self) -> Result<BridgeStatistics, BridgeError> {
		let quotes: Vec<(String, Quote)> = self
			.storage
			.query(StorageKey::Quotes.as_str(), QueryFilter::All)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to query quotes: {e}")))?;
		let settlements: Vec<(String, Settlement)> = self
			.storage
			.query(StorageKey::Settlements.as_str(), QueryFilter::All)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to query settlements: {e}")))?;
		let transactions: Vec<(String, UserTransaction)> = self
			.storage
			.query(StorageKey::UserTransactions.as_str(), QueryFilter::All)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to query user transactions: {e}")))?;

		let reserve = self.reserve.snapshot().await;

		let mut stats = BridgeStatistics {
			total_quotes: quotes.len(),
			total_settlements: settlements.len(),
			total_user_transactions: transactions.len(),
			reserve_available: reserve.available(),
			reserve_health: Some(reserve.health()),
			..Default::default()
		};
		for (_, q) in &quotes {
			match q.status {
				QuoteStatus::Active => stats.active_quotes += 1,
				QuoteStatus::Settled => stats.settled_quotes += 1,
				QuoteStatus::Expired => stats.expired_quotes += 1,
				QuoteStatus::Failed => {}
			}
		}
		for (_, s) in &settlements {
			match s.status {
				SettlementStatus::Pending | SettlementStatus::Executing => stats.pending_settlements += 1,
				SettlementStatus::Completed => stats.completed_settlements += 1,
				SettlementStatus::Failed => stats.failed_settlements += 1,
			}
		}
		Ok(stats)
	}

	pub async fn get_price_feed_status(&self) -> Result<PriceFeedStatus, BridgeError> {
		let (source, eth) = self.price.price_pair(&source_asset_name(&self.config)).await?;
		Ok(PriceFeedStatus { source, eth })
	}

	pub fn get_config(&self) -> BridgeConfig {
		let mut sanitized = self.config.clone();
		sanitized.signer.config = toml::Value::String("***redacted***".to_string());
		sanitized
	}

	// -- admin reserve ops -------------------------------------------------

	pub async fn admin_add_reserve_funds(&self, actor: &str, amount: u64) -> Result<(), BridgeError> {
		let is_admin = self.is_admin(actor).await;
		self.reserve.topup(is_admin, amount).await?;
		self.audit("reserve_topup", Some(actor.to_string()), Some(amount)).await;
		Ok(())
	}

	pub async fn admin_set_daily_limit(&self, actor: &str, limit: u64) -> Result<(), BridgeError> {
		let is_admin = self.is_admin(actor).await;
		self.reserve.set_daily_limit(is_admin, limit).await?;
		self.audit("daily_limit_set", Some(actor.to_string()), Some(limit)).await;
		Ok(())
	}

	pub async fn admin_set_reserve_thresholds(
		&self,
		actor: &str,
		warning: u64,
		critical: u64,
	) -> Result<(), BridgeError> {
		let is_admin = self.is_admin(actor).await;
		self.reserve.set_thresholds(is_admin, warning, critical).await?;
		self.audit("thresholds_set", Some(actor.to_string()), None).await;
		Ok(())
	}

	pub async fn admin_emergency_pause(&self, actor: &str) -> Result<(), BridgeError> {
		let is_admin = self.is_admin(actor).await;
		self.reserve.pause(is_admin).await?;
		self.audit("emergency_pause", Some(actor.to_string()), None).await;
		Ok(())
	}

	pub async fn admin_emergency_unpause(&self, actor: &str) -> Result<(), BridgeError> {
		let is_admin = self.is_admin(actor).await;
		self.reserve.unpause(is_admin).await?;
		self.audit("emergency_unpause", Some(actor.to_string()), None).await;
		Ok(())
	}

	/// `update_config` (§6): admin-only, persists the raw config document for
	/// operator inspection. Live values already loaded into the running
	/// engine (RPC pool, reserve thresholds, etc.) are not hot-reloaded; an
	/// operator applies a changed config by restarting the process.
	pub async fn update_config(&self, actor: &str, raw_toml: String) -> Result<(), BridgeError> {
		if !self.is_admin(actor).await {
			return Err(AdminError::NotAdmin.into());
		}
		let parsed: BridgeConfig = raw_toml
			.parse()
			.map_err(|e: bridge_config::ConfigError| BridgeError::from(ConfigError::from(e)))?;
		self.storage
			.store(StorageKey::Config.as_str(), "current", &parsed, None)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to persist config: {e}")))?;
		self.audit("config_updated", Some(actor.to_string()), None).await;
		Ok(())
	}

	// -- cache ops ---------------------------------------------------------

	pub async fn clear_rpc_cache(&self) {
		self.rpc.clear_cache().await;
	}

	pub async fn invalidate_gas_cache(&self) {
		self.gas.invalidate().await;
	}

	pub async fn get_rpc_cache_stats(&self) -> RpcStats {
		self.rpc.stats().await
	}

	async fn audit(&self, event_type: &str, actor: Option<String>, amount: Option<u64>) {
		let details = format!("{event_type} on bridge {}", self.config.bridge.id);
		let mut entry = AuditEntry::new(event_type, details, current_timestamp());
		if let Some(actor) = actor {
			entry = entry.with_admin(actor);
		}
		if let Some(amount) = amount {
			entry = entry.with_amount(amount);
		}
		if let Err(e) = self
			.storage
			.store(StorageKey::AuditLog.as_str(), &entry.id.to_string(), &entry, None)
			.await
		{
			tracing::warn!(error = %e, "failed to persist audit entry");
		}
	}
}

/// The source chain doubles as the priced asset ticker (e.g. `icp` ->
/// `ICP`): this bridge has exactly one source asset, so there is no separate
/// `source_asset` config field.
fn source_asset_name(config: &BridgeConfig) -> String {
	config.bridge.source_chain.to_uppercase()
}

fn build_storage(config: &BridgeConfig) -> Result<StorageService, BridgeError> {
	let factories: HashMap<&'static str, bridge_storage::StorageFactory> =
		bridge_storage::get_all_implementations().into_iter().collect();
	let factory = factories.get(config.storage.primary.as_str()).ok_or_else(|| {
		BridgeError::from(ConfigError::Validation(format!(
			"unknown storage implementation: {}",
			config.storage.primary
		)))
	})?;
	let raw = config
		.storage
		.implementations
		.get(&config.storage.primary)
		.cloned()
		.unwrap_or(toml::Value::Table(Default::default()));
	let backend = factory(&raw).map_err(|e| BridgeError::Internal(format!("storage init failed: {e}")))?;
	Ok(StorageService::new(backend))
}

fn build_price_feed(config: &BridgeConfig) -> Result<PriceFeedService, BridgeError> {
	let factories: HashMap<&'static str, bridge_price::PriceSourceFactory> =
		bridge_price::get_all_implementations().into_iter().collect();

	let mut sources: Vec<Arc<dyn bridge_price::PriceSourceInterface>> = Vec::new();
	for (name, raw) in &config.price.sources {
		let factory = factories.get(name.as_str()).ok_or_else(|| {
			BridgeError::from(ConfigError::Validation(format!("unknown price source: {name}")))
		})?;
		let source = factory(raw).map_err(BridgeError::from)?;
		sources.push(Arc::from(source));
	}
	PriceFeedService::new(sources).map_err(BridgeError::from)
}

fn build_signer(config: &BridgeConfig) -> Result<SignerService, BridgeError> {
	let factories: HashMap<&'static str, bridge_signer::SignerFactory> =
		bridge_signer::get_all_implementations().into_iter().collect();
	let factory = factories.get(config.signer.provider.as_str()).ok_or_else(|| {
		BridgeError::from(ConfigError::Validation(format!(
			"unknown signer provider: {}",
			config.signer.provider
		)))
	})?;
	let implementation = factory(&config.signer.config).map_err(BridgeError::from)?;
	Ok(SignerService::new(implementation))
}

async fn bootstrap_admins(storage: &StorageService, bootstrap_admin: &str) -> Result<(), BridgeError> {
	if storage
		.exists(StorageKey::Admins.as_str(), ADMIN_SET_ID)
		.await
		.map_err(|e| BridgeError::Internal(format!("storage error: {e}")))?
	{
		return Ok(());
	}
	let admins = vec![bootstrap_admin.to_string()];
	storage
		.store(StorageKey::Admins.as_str(), ADMIN_SET_ID, &admins, None)
		.await
		.map_err(|e| BridgeError::Internal(format!("failed to bootstrap admins: {e}")))
}

async fn load_or_init_reserve(storage: &StorageService, config: &BridgeConfig) -> Result<Reserve, BridgeError> {
	if let Ok(reserve) = storage
		.retrieve::<Reserve>(StorageKey::ReserveState.as_str(), "current")
		.await
	{
		return Ok(reserve);
	}
	let reserve = Reserve {
		balance: config.reserve.initial_balance,
		locked: 0,
		threshold_warning: config.reserve.threshold_warning,
		threshold_critical: config.reserve.threshold_critical,
		daily_limit: config.reserve.daily_limit,
		daily_used: 0,
		day_anchor_timestamp: current_timestamp(),
		paused: false,
		last_topup: None,
	};
	storage
		.store(StorageKey::ReserveState.as_str(), "current", &reserve, None)
		.await
		.map_err(|e| BridgeError::Internal(format!("failed to persist initial reserve: {e}")))?;
	Ok(reserve)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_config() -> BridgeConfig {
		let raw = r#"
[bridge]
id = "bridge-test"
bootstrap_admin = "root-admin"
source_chain = "icp"

[quote]
min_quote_amount = 1000000000000000
max_quote_amount = 10000000000000000000
quote_validity_minutes = 15
safety_margin_percent = 20
max_gas_price = 500000000000

[reserve]
initial_balance = 50000000000000000000
threshold_warning = 5000000000000000000
threshold_critical = 1000000000000000000
daily_limit = 20000000000000000000

[[supported_chains]]
name = "base-sepolia"
chain_id = 84532
rpc_urls = ["https://sepolia.base.org"]

[storage]
primary = "memory"
[storage.implementations.memory]

[signer]
provider = "local"
[signer.config]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff8"

[price.sources.fixed]
[price.sources.coingecko]
"#;
		raw.parse().expect("sample config must be valid")
	}

	async fn sample_engine() -> Arc<BridgeEngine> {
		BridgeEngine::bootstrap(sample_config())
			.await
			.expect("bootstrap must succeed against the in-memory backend")
	}

	#[tokio::test]
	async fn bootstrap_seeds_the_bootstrap_admin() {
		let engine = sample_engine().await;
		assert!(engine.is_admin("root-admin").await);
		assert!(!engine.is_admin("nobody").await);
	}

	#[tokio::test]
	async fn non_admin_cannot_add_admin() {
		let engine = sample_engine().await;
		let err = engine
			.add_admin("nobody", "new-admin".to_string())
			.await
			.unwrap_err();
		assert_eq!(err.error_code(), AdminError::NotAdmin.into().error_code());
		assert!(!engine.is_admin("new-admin").await);
	}

	#[tokio::test]
	async fn admin_can_add_another_admin() {
		let engine = sample_engine().await;
		engine
			.add_admin("root-admin", "deputy".to_string())
			.await
			.unwrap();
		assert!(engine.is_admin("deputy").await);
	}

	#[tokio::test]
	async fn get_quote_reports_not_found_for_unknown_id() {
		let engine = sample_engine().await;
		let err = engine.get_quote(BridgeId::generate()).await.unwrap_err();
		assert_eq!(
			err.error_code(),
			bridge_types::QuoteError::NotFound(String::new()).into().error_code()
		);
	}

	#[tokio::test]
	async fn get_bridge_statistics_starts_empty() {
		let engine = sample_engine().await;
		let stats = engine.get_bridge_statistics().await.unwrap();
		assert_eq!(stats.total_quotes, 0);
		assert_eq!(stats.total_settlements, 0);
		assert_eq!(stats.total_user_transactions, 0);
		assert_eq!(stats.reserve_available, 50000000000000000000);
	}

	#[tokio::test]
	async fn get_config_redacts_signer_secret() {
		let engine = sample_engine().await;
		let sanitized = engine.get_config();
		assert_eq!(
			sanitized.signer.config,
			toml::Value::String("***redacted***".to_string())
		);
	}

	#[tokio::test]
	async fn admin_reserve_ops_require_admin_membership() {
		let engine = sample_engine().await;
		let err = engine
			.admin_add_reserve_funds("nobody", 100)
			.await
			.unwrap_err();
		assert_eq!(err.error_code(), AdminError::NotAdmin.into().error_code());

		engine
			.admin_add_reserve_funds("root-admin", 100)
			.await
			.unwrap();
		let status = engine.get_detailed_reserve_status().await;
		assert_eq!(status.reserve.balance, 50000000000000000100);
	}

	#[tokio::test]
	async fn emergency_pause_and_unpause_round_trip() {
		let engine = sample_engine().await;
		engine.admin_emergency_pause("root-admin").await.unwrap();
		assert!(engine.get_detailed_reserve_status().await.reserve.paused);
		engine.admin_emergency_unpause("root-admin").await.unwrap();
		assert!(!engine.get_detailed_reserve_status().await.reserve.paused);
	}

	#[tokio::test]
	async fn cache_ops_do_not_error_against_a_fresh_engine() {
		let engine = sample_engine().await;
		engine.clear_rpc_cache().await;
		engine.invalidate_gas_cache().await;
		let stats = engine.get_rpc_cache_stats().await;
		assert_eq!(stats.cache_hits, 0);
	}

	#[test]
	fn source_asset_name_uppercases_the_source_chain() {
		let config = sample_config();
		assert_eq!(source_asset_name(&config), "ICP");
	}
}
