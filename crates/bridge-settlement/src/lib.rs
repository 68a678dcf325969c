//! Settlement Engine: drives a Settlement through Pending -> Executing ->
//! Completed/Failed, orchestrating payment verification, transaction
//! building, signing, broadcast, and reserve commitment as direct async
//! method calls rather than through an event bus — a single-process bridge
//! has no need for that decoupling. Follows a verify-then-advance shape,
//! generalized here to EVM broadcast plus receipt polling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_gas::{CallKind, GasEstimator};
use bridge_payment::PaymentVerifier;
use bridge_reserve::ReserveManager;
use bridge_rpc::RpcClient;
use bridge_signer::SignerService;
use bridge_storage::StorageService;
use bridge_tx::Eip1559Transaction;
use bridge_types::{
	current_timestamp, AuditEntry, BridgeError, BridgeId, Quote, QuoteError, QuoteStatus,
	RpcError, Settlement, SettlementStatus, StorageKey, TransactionHash, UserTransaction,
	UserTransactionStatus,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

const MAX_RETRIES: u32 = 3;
const FEE_BUMP_NUMERATOR: u128 = 1125; // 12.5% bump per EIP-1559 replacement rules
const FEE_BUMP_DENOMINATOR: u128 = 1000;
const RECEIPT_POLL_BACKOFFS: [Duration; 4] = [
	Duration::from_secs(1),
	Duration::from_secs(2),
	Duration::from_secs(5),
	Duration::from_secs(10),
];
const RECEIPT_POLL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const PROOF_INDEX_NAMESPACE: &str = "settlement_by_proof";

pub struct SettlementEngineConfig {
	pub chain_id: u64,
}

pub struct SettlementEngine {
	config: SettlementEngineConfig,
	payment: Arc<PaymentVerifier>,
	signer: Arc<SignerService>,
	rpc: Arc<RpcClient>,
	reserve: Arc<ReserveManager>,
	gas: Arc<GasEstimator>,
	storage: Arc<StorageService>,
	/// In-flight nonces this engine has issued, per chain, floored against
	/// the node's view on every fetch so two concurrent broadcasts never
	/// collide within the RPC nonce cache's TTL.
	nonce_counters: Mutex<HashMap<u64, u64>>,
	proof_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SettlementEngine {
	pub fn new(
		config: SettlementEngineConfig,
		payment: Arc<PaymentVerifier>,
		signer: Arc<SignerService>,
		rpc: Arc<RpcClient>,
		reserve: Arc<ReserveManager>,
		gas: Arc<GasEstimator>,
		storage: Arc<StorageService>,
	) -> Self {
		Self {
			config,
			payment,
			signer,
			rpc,
			reserve,
			gas,
			storage,
			nonce_counters: Mutex::new(HashMap::new()),
			proof_locks: Mutex::new(HashMap::new()),
		}
	}

	async fn lock_for_proof(&self, payment_proof: &str) -> Arc<Mutex<()>> {
		let mut locks = self.proof_locks.lock().await;
		Arc::clone(
			locks
				.entry(payment_proof.to_string())
				.or_insert_with(|| Arc::new(Mutex::new(()))),
		)
	}

	/// Fetches the confirmed nonce and floors it against the highest nonce
	/// this engine has already issued for the chain, then reserves the next
	/// one for the following caller.
	async fn next_nonce(&self) -> Result<u64, BridgeError> {
		let signer_address = self.signer.ethereum_address();
		let fetched = self.rpc.nonce(signer_address).await?;
		let mut counters = self.nonce_counters.lock().await;
		let next = counters
			.get(&self.config.chain_id)
			.copied()
			.map_or(fetched, |issued| issued.max(fetched));
		counters.insert(self.config.chain_id, next + 1);
		Ok(next)
	}

	/// Settles `quote_id` against `payment_proof`. Idempotent: a repeat call
	/// with the same proof returns the existing Settlement, per §4.9.
	pub async fn bridge_assets(
		&self,
		quote_id: BridgeId,
		payment_proof: String,
	) -> Result<Settlement, BridgeError> {
		let proof_lock = self.lock_for_proof(&payment_proof).await;
		let _guard = proof_lock.lock().await;

		if let Some(existing_id) = self.lookup_by_proof(&payment_proof).await? {
			return self.load_settlement(existing_id).await;
		}

		let mut quote: Quote = self
			.storage
			.retrieve(StorageKey::Quotes.as_str(), &quote_id.to_string())
			.await
			.map_err(|_| QuoteError::NotFound(quote_id.to_string()))?;

		if quote.status == QuoteStatus::Settled {
			return Err(QuoteError::AlreadySettled(quote_id.to_string()).into());
		}
		if quote.status == QuoteStatus::Expired || quote.is_expired(current_timestamp()) {
			return Err(QuoteError::Expired(quote_id.to_string()).into());
		}
		if quote.status != QuoteStatus::Active {
			return Err(QuoteError::NotActive {
				id: quote_id.to_string(),
				status: quote.status,
			}
			.into());
		}

		self.payment
			.verify(&payment_proof, &quote.user, quote.total_cost)
			.await?;

		let settlement = Settlement {
			id: BridgeId::generate(),
			quote_id,
			user: quote.user.clone(),
			amount: quote.amount_out,
			destination_address: quote.destination_address,
			destination_chain: quote.destination_chain.clone(),
			payment_proof: payment_proof.clone(),
			created_at: current_timestamp(),
			status: SettlementStatus::Pending,
			gas_used: None,
			transaction_hash: None,
			retry_count: 0,
			last_error: None,
			nonce: None,
		};
		self.persist(&settlement).await?;
		self.index_by_proof(&payment_proof, settlement.id).await?;

		let settlement = self.execute(settlement, &mut quote).await?;
		Ok(settlement)
	}

	async fn lookup_by_proof(&self, payment_proof: &str) -> Result<Option<BridgeId>, BridgeError> {
		if !self
			.storage
			.exists(PROOF_INDEX_NAMESPACE, payment_proof)
			.await
			.map_err(|e| BridgeError::Internal(format!("storage error: {e}")))?
		{
			return Ok(None);
		}
		let id: String = self
			.storage
			.retrieve(PROOF_INDEX_NAMESPACE, payment_proof)
			.await
			.map_err(|e| BridgeError::Internal(format!("storage error: {e}")))?;
		Ok(Some(
			id.parse()
				.map_err(|_| BridgeError::Internal("corrupt settlement proof index".into()))?,
		))
	}

	async fn index_by_proof(&self, payment_proof: &str, id: BridgeId) -> Result<(), BridgeError> {
		self.storage
			.store(PROOF_INDEX_NAMESPACE, payment_proof, &id.to_string(), None)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to index settlement: {e}")))
	}

	async fn load_settlement(&self, id: BridgeId) -> Result<Settlement, BridgeError> {
		self.storage
			.retrieve(StorageKey::Settlements.as_str(), &id.to_string())
			.await
			.map_err(|_| BridgeError::Internal(format!("settlement {id} missing after indexing")))
	}

	async fn persist(&self, settlement: &Settlement) -> Result<(), BridgeError> {
		self.storage
			.store(
				StorageKey::Settlements.as_str(),
				&settlement.id.to_string(),
				settlement,
				None,
			)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to persist settlement: {e}")))
	}

	/// Pending -> Executing -> Completed/Failed, per the §4.9 state machine.
	async fn execute(
		&self,
		mut settlement: Settlement,
		quote: &mut Quote,
	) -> Result<Settlement, BridgeError> {
		settlement.status = SettlementStatus::Executing;
		self.persist(&settlement).await?;

		let mut nonce = self.next_nonce().await?;
		let mut max_fee_per_gas = quote.max_fee_per_gas as u128;
		let mut priority_fee = quote.priority_fee as u128;

		let broadcast_result = loop {
			let tx = Eip1559Transaction {
				chain_id: self.config.chain_id,
				nonce,
				max_priority_fee_per_gas: priority_fee,
				max_fee_per_gas,
				gas_limit: quote.gas_estimate,
				to: quote.destination_address,
				value: alloy_primitives::U256::from(quote.amount_out),
				data: alloy_primitives::Bytes::new(),
			};

			let digest = tx.signing_preimage();
			let signature = self
				.signer
				.sign(digest)
				.await
				.map_err(bridge_types::BridgeError::from)?;
			let (raw, _preimage_hash) = tx.finalize(signature);

			match self.rpc.send_raw(&raw).await {
				Ok(tx_hash) => break Ok(tx_hash),
				Err(err) => {
					warn!(error = %err, retry_count = settlement.retry_count, "broadcast failed");
					if is_nonce_too_low(&err) {
						nonce = self.next_nonce().await?;
						continue;
					}
					if err.is_transient() && settlement.retry_count < MAX_RETRIES {
						settlement.retry_count += 1;
						settlement.last_error = Some(err.to_string());
						self.persist(&settlement).await?;
						max_fee_per_gas = bump_fee(max_fee_per_gas);
						priority_fee = bump_fee(priority_fee);
						if let Ok(plan) = self.gas.estimate(CallKind::PlainTransfer, Duration::from_secs(900)).await
						{
							max_fee_per_gas = max_fee_per_gas.max(plan.max_fee_per_gas as u128);
							priority_fee = priority_fee.max(plan.priority_fee as u128);
						}
						continue;
					}
					break Err(err);
				}
			}
		};

		let tx_hash = match broadcast_result {
			Ok(hash) => hash,
			Err(err) => {
				return self.fail(settlement, quote, err.to_string()).await;
			}
		};

		settlement.transaction_hash = Some(tx_hash);
		settlement.nonce = Some(nonce);
		self.persist(&settlement).await?;

		match self.poll_receipt(tx_hash).await {
			Some(receipt) if receipt.status => {
				settlement.status = SettlementStatus::Completed;
				settlement.gas_used = Some(receipt.gas_used);
				self.persist(&settlement).await?;

				self.reserve.commit(quote.reserved_amount()).await;
				quote.status = QuoteStatus::Settled;
				self.storage
					.update(StorageKey::Quotes.as_str(), &quote.id.to_string(), quote, None)
					.await
					.map_err(|e| BridgeError::Internal(format!("failed to update quote: {e}")))?;

				self.audit("settlement_completed", &settlement).await;
				info!(settlement_id = %settlement.id, tx_hash = %tx_hash, "settlement completed");
				Ok(settlement)
			}
			Some(_failed_receipt) => {
				self.fail(settlement, quote, "transaction reverted".to_string()).await
			}
			None => {
				self.fail(settlement, quote, "receipt polling timed out".to_string())
					.await
			}
		}
	}

	async fn poll_receipt(&self, tx_hash: TransactionHash) -> Option<bridge_types::TransactionReceipt> {
		let deadline = tokio::time::Instant::now() + RECEIPT_POLL_TIMEOUT;
		let mut backoffs = RECEIPT_POLL_BACKOFFS.iter().cycle();

		loop {
			if let Ok(Some(receipt)) = self.rpc.receipt(tx_hash).await {
				return Some(receipt);
			}
			if tokio::time::Instant::now() >= deadline {
				return None;
			}
			let wait = *backoffs.next().expect("cycle never ends");
			tokio::time::sleep(wait.min(deadline.saturating_duration_since(tokio::time::Instant::now())))
				.await;
		}
	}

	/// Marks the settlement Failed, unlocks any remaining reservation, and
	/// enqueues a refund record if the source payment was already captured.
	async fn fail(
		&self,
		mut settlement: Settlement,
		quote: &Quote,
		reason: String,
	) -> Result<Settlement, BridgeError> {
		settlement.status = SettlementStatus::Failed;
		settlement.last_error = Some(reason.clone());
		self.persist(&settlement).await?;

		self.reserve.unlock(quote.reserved_amount()).await;

		let refund = UserTransaction {
			id: BridgeId::generate(),
			user: settlement.user.clone(),
			icp_payment_id: settlement.payment_proof.clone(),
			settlement_id: Some(settlement.id),
			amount_source: quote.total_cost,
			amount_eth: settlement.amount,
			gas_sponsored: quote.gas_budget(),
			status: UserTransactionStatus::Refunded,
			created_at: current_timestamp(),
		};
		self.storage
			.store(
				StorageKey::UserTransactions.as_str(),
				&refund.id.to_string(),
				&refund,
				None,
			)
			.await
			.map_err(|e| BridgeError::Internal(format!("failed to record refund: {e}")))?;

		self.audit("settlement_failed", &settlement).await;
		warn!(settlement_id = %settlement.id, reason, "settlement failed, refund enqueued");
		Ok(settlement)
	}

	async fn audit(&self, event_type: &str, settlement: &Settlement) {
		let mut entry = AuditEntry::new(
			event_type,
			format!("settlement {}", settlement.id),
			current_timestamp(),
		)
		.with_actor(settlement.user.clone())
		.with_amount(settlement.amount);
		if let Some(hash) = settlement.transaction_hash {
			entry = entry.with_tx_hash(hash);
		}
		if let Err(e) = self
			.storage
			.store(StorageKey::AuditLog.as_str(), &entry.id.to_string(), &entry, None)
			.await
		{
			warn!(error = %e, "failed to persist audit entry");
		}
	}
}

fn bump_fee(fee: u128) -> u128 {
	(fee * FEE_BUMP_NUMERATOR) / FEE_BUMP_DENOMINATOR
}

fn is_nonce_too_low(err: &RpcError) -> bool {
	match err {
		RpcError::BadResponse(msg) => msg.to_lowercase().contains("nonce too low"),
		RpcError::Code { message, .. } => message.to_lowercase().contains("nonce too low"),
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fee_bump_is_at_least_12_5_percent() {
		let bumped = bump_fee(1_000_000_000);
		assert_eq!(bumped, 1_125_000_000);
	}

	#[test]
	fn nonce_too_low_is_detected_case_insensitively() {
		assert!(is_nonce_too_low(&RpcError::BadResponse(
			"Nonce Too Low: expected 5".into()
		)));
		assert!(!is_nonce_too_low(&RpcError::Timeout));
	}
}

#[cfg(test)]
mod proof_idempotency_tests {
	use super::*;
	use bridge_payment::{LedgerTransfer, PaymentVerifier, SourceLedgerInterface, StorageBackedLedger};
	use bridge_reserve::ReserveManager;
	use bridge_signer::implementations::local::LocalSigner;
	use bridge_storage::implementations::memory::MemoryStorage;
	use bridge_types::Reserve;
	use httpmock::Method::POST;
	use httpmock::MockServer;
	use serde_json::json;

	fn reserve() -> Reserve {
		Reserve {
			balance: 1_000_000_000_000,
			locked: 500,
			threshold_warning: 0,
			threshold_critical: 0,
			daily_limit: 1_000_000_000_000,
			daily_used: 0,
			day_anchor_timestamp: current_timestamp(),
			paused: false,
			last_topup: None,
		}
	}

	fn quote(id: BridgeId) -> Quote {
		Quote {
			id,
			user: "alice".into(),
			amount_requested: 1_000,
			amount_out: 100,
			gas_estimate: 21_000,
			base_fee: 1,
			priority_fee: 1,
			max_fee_per_gas: 1,
			safety_margin: 0,
			total_cost: 1_000,
			destination_address: alloy_primitives::Address::ZERO,
			source_chain: "icp".into(),
			destination_chain: "ethereum".into(),
			created_at: current_timestamp(),
			expires_at: current_timestamp() + 900,
			status: QuoteStatus::Active,
		}
	}

	/// Two concurrent `bridge_assets` calls sharing a `payment_proof` must
	/// serialize on it: only the first actually verifies payment and
	/// broadcasts, the second observes the indexed settlement and returns it.
	#[tokio::test]
	async fn concurrent_bridge_assets_with_same_proof_broadcasts_once() {
		let server = MockServer::start();
		server.mock(|when, then| {
			when.method(POST).path("/").body_contains("eth_getTransactionCount");
			then.status(200)
				.json_body(json!({"jsonrpc": "2.0", "id": 1, "result": "0x5"}));
		});
		let send_raw_mock = server.mock(|when, then| {
			when.method(POST).path("/").body_contains("eth_sendRawTransaction");
			then.status(200).json_body(json!({
				"jsonrpc": "2.0",
				"id": 1,
				"result": format!("0x{}", "11".repeat(32)),
			}));
		});
		server.mock(|when, then| {
			when.method(POST).path("/").body_contains("eth_getTransactionReceipt");
			then.status(200).json_body(json!({
				"jsonrpc": "2.0",
				"id": 1,
				"result": {
					"blockNumber": "0x10",
					"status": "0x1",
					"gasUsed": "0x5208",
					"effectiveGasPrice": "0x3b9aca00",
				},
			}));
		});

		let rpc = Arc::new(RpcClient::new(vec![server.url("/")]).unwrap());
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let ledger = Arc::new(StorageBackedLedger::new(storage.interface()));
		ledger
			.record_transfer(LedgerTransfer {
				proof_id: "proof-concurrent".into(),
				from: "alice".into(),
				to: "collection".into(),
				amount: 1_000,
				finalized: true,
			})
			.await
			.unwrap();
		let payment = Arc::new(PaymentVerifier::new(
			ledger as Arc<dyn SourceLedgerInterface>,
			storage.interface(),
		));
		let signer = Arc::new(SignerService::new(Box::new(
			LocalSigner::from_bytes([3u8; 32]).unwrap(),
		)));
		let reserve_mgr = Arc::new(ReserveManager::new(reserve()));
		let gas = Arc::new(GasEstimator::new((*rpc).clone(), 10));

		let engine = Arc::new(SettlementEngine::new(
			SettlementEngineConfig { chain_id: 1 },
			payment,
			signer,
			rpc,
			reserve_mgr,
			gas,
			storage.clone(),
		));

		let quote_id = BridgeId::generate();
		storage
			.store(StorageKey::Quotes.as_str(), &quote_id.to_string(), &quote(quote_id), None)
			.await
			.unwrap();

		let (first, second) = tokio::join!(
			engine.bridge_assets(quote_id, "proof-concurrent".to_string()),
			engine.bridge_assets(quote_id, "proof-concurrent".to_string())
		);
		let first = first.unwrap();
		let second = second.unwrap();

		assert_eq!(first.id, second.id);
		assert_eq!(first.status, SettlementStatus::Completed);
		assert_eq!(send_raw_mock.hits(), 1);
	}
}
