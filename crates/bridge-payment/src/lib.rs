//! Payment Verifier (C6): confirms a `payment_proof` represents a finalized
//! transfer of at least `quote.total_cost` from the user to the bridge's
//! collection account, and rejects proofs that have already been consumed
//! by an earlier settlement, per §4.6.
//!
//! The source ledger is an external collaborator outside this core (§1), so
//! it is specified here as a trait with one concrete in-process
//! implementation backed by `bridge-storage`: a federated "collection
//! account" ledger of recorded transfers, enough to exercise the full
//! verify/duplicate-detection logic without assuming a specific external
//! chain SDK.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_storage::StorageInterface;
use bridge_types::PaymentError;
use serde::{Deserialize, Serialize};

/// One recorded transfer on the source ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransfer {
	pub proof_id: String,
	pub from: String,
	pub to: String,
	pub amount: u64,
	pub finalized: bool,
}

/// Abstraction over the source-chain ledger that holds the user's deposit
/// into the bridge's collection account.
#[async_trait]
pub trait SourceLedgerInterface: Send + Sync {
	async fn get_transfer(&self, proof_id: &str) -> Result<Option<LedgerTransfer>, PaymentError>;
}

const NAMESPACE: &str = "collection_ledger";
const USED_PROOFS_NAMESPACE: &str = "used_payment_proofs";

/// In-process source ledger backed by `bridge-storage`. Transfers are
/// recorded ahead of time (e.g. by a test harness or a deposit-watcher) and
/// looked up by proof id.
pub struct StorageBackedLedger {
	storage: Arc<dyn StorageInterface>,
}

impl StorageBackedLedger {
	pub fn new(storage: Arc<dyn StorageInterface>) -> Self {
		Self { storage }
	}

	pub async fn record_transfer(&self, transfer: LedgerTransfer) -> Result<(), PaymentError> {
		let key = format!("{NAMESPACE}:{}", transfer.proof_id);
		let bytes = serde_json::to_vec(&transfer)
			.map_err(|e| PaymentError::NotFound(format!("failed to serialize transfer: {e}")))?;
		self.storage
			.set_bytes(&key, bytes, None, None)
			.await
			.map_err(|e| PaymentError::NotFound(format!("storage error: {e}")))
	}
}

#[async_trait]
impl SourceLedgerInterface for StorageBackedLedger {
	async fn get_transfer(&self, proof_id: &str) -> Result<Option<LedgerTransfer>, PaymentError> {
		let key = format!("{NAMESPACE}:{proof_id}");
		if !self
			.storage
			.exists(&key)
			.await
			.map_err(|e| PaymentError::NotFound(format!("storage error: {e}")))?
		{
			return Ok(None);
		}
		let bytes = self
			.storage
			.get_bytes(&key)
			.await
			.map_err(|e| PaymentError::NotFound(format!("storage error: {e}")))?;
		let transfer: LedgerTransfer = serde_json::from_slice(&bytes)
			.map_err(|e| PaymentError::NotFound(format!("corrupt transfer record: {e}")))?;
		Ok(Some(transfer))
	}
}

/// Verifies payment proofs against the source ledger and guards against
/// reuse across settlements.
pub struct PaymentVerifier {
	ledger: Arc<dyn SourceLedgerInterface>,
	storage: Arc<dyn StorageInterface>,
}

impl PaymentVerifier {
	pub fn new(ledger: Arc<dyn SourceLedgerInterface>, storage: Arc<dyn StorageInterface>) -> Self {
		Self { ledger, storage }
	}

	/// Verifies `payment_proof` covers at least `required_amount` from
	/// `expected_user`, is finalized, and has not been consumed before.
	/// Marks the proof as used on success.
	pub async fn verify(
		&self,
		payment_proof: &str,
		expected_user: &str,
		required_amount: u64,
	) -> Result<(), PaymentError> {
		let used_key = format!("{USED_PROOFS_NAMESPACE}:{payment_proof}");
		if self
			.storage
			.exists(&used_key)
			.await
			.map_err(|e| PaymentError::NotFound(format!("storage error: {e}")))?
		{
			return Err(PaymentError::AlreadyUsed(payment_proof.to_string()));
		}

		let transfer = self
			.ledger
			.get_transfer(payment_proof)
			.await?
			.ok_or_else(|| PaymentError::NotFound(payment_proof.to_string()))?;

		if !transfer.finalized {
			return Err(PaymentError::NotFinal(payment_proof.to_string()));
		}
		if transfer.from != expected_user {
			return Err(PaymentError::AmountMismatch {
				paid: 0,
				required: required_amount,
			});
		}
		if transfer.amount < required_amount {
			return Err(PaymentError::AmountMismatch {
				paid: transfer.amount,
				required: required_amount,
			});
		}

		self.storage
			.set_bytes(&used_key, payment_proof.as_bytes().to_vec(), None, None)
			.await
			.map_err(|e| PaymentError::NotFound(format!("storage error: {e}")))?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bridge_storage::implementations::memory::MemoryStorage;

	fn storage() -> Arc<dyn StorageInterface> {
		Arc::new(MemoryStorage::new())
	}

	#[tokio::test]
	async fn verifies_a_finalized_transfer_covering_the_required_amount() {
		let storage = storage();
		let ledger = Arc::new(StorageBackedLedger::new(Arc::clone(&storage)));
		ledger
			.record_transfer(LedgerTransfer {
				proof_id: "proof-1".into(),
				from: "alice".into(),
				to: "collection".into(),
				amount: 1_000,
				finalized: true,
			})
			.await
			.unwrap();

		let verifier = PaymentVerifier::new(ledger, storage);
		verifier.verify("proof-1", "alice", 1_000).await.unwrap();
	}

	#[tokio::test]
	async fn rejects_reused_proofs() {
		let storage = storage();
		let ledger = Arc::new(StorageBackedLedger::new(Arc::clone(&storage)));
		ledger
			.record_transfer(LedgerTransfer {
				proof_id: "proof-2".into(),
				from: "alice".into(),
				to: "collection".into(),
				amount: 1_000,
				finalized: true,
			})
			.await
			.unwrap();

		let verifier = PaymentVerifier::new(ledger, storage);
		verifier.verify("proof-2", "alice", 1_000).await.unwrap();
		let err = verifier.verify("proof-2", "alice", 1_000).await.unwrap_err();
		assert!(matches!(err, PaymentError::AlreadyUsed(_)));
	}

	#[tokio::test]
	async fn rejects_insufficient_amount() {
		let storage = storage();
		let ledger = Arc::new(StorageBackedLedger::new(Arc::clone(&storage)));
		ledger
			.record_transfer(LedgerTransfer {
				proof_id: "proof-3".into(),
				from: "alice".into(),
				to: "collection".into(),
				amount: 500,
				finalized: true,
			})
			.await
			.unwrap();

		let verifier = PaymentVerifier::new(ledger, storage);
		let err = verifier.verify("proof-3", "alice", 1_000).await.unwrap_err();
		assert!(matches!(err, PaymentError::AmountMismatch { .. }));
	}

	#[tokio::test]
	async fn rejects_non_final_transfers() {
		let storage = storage();
		let ledger = Arc::new(StorageBackedLedger::new(Arc::clone(&storage)));
		ledger
			.record_transfer(LedgerTransfer {
				proof_id: "proof-4".into(),
				from: "alice".into(),
				to: "collection".into(),
				amount: 1_000,
				finalized: false,
			})
			.await
			.unwrap();

		let verifier = PaymentVerifier::new(ledger, storage);
		let err = verifier.verify("proof-4", "alice", 1_000).await.unwrap_err();
		assert!(matches!(err, PaymentError::NotFinal(_)));
	}
}
