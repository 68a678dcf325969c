//! Core data model (§3): Quote, Settlement, UserTransaction, Reserve, PriceSample,
//! RpcEndpoint, AuditEntry, plus the aggregated `PriceData` and `ReserveHealth`
//! views that the component designs in §4 reference but §3 leaves implicit.

use crate::ids::BridgeId;
use crate::primitives::{Address, ChainId, TransactionHash};
use serde::{Deserialize, Serialize};

/// Status of a Quote across its lifetime (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
	Active,
	Settled,
	Expired,
	Failed,
}

/// A time-bound promise to deliver `amount_out` wei at a stated total cost (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
	pub id: BridgeId,
	pub user: String,
	pub amount_requested: u64,
	pub amount_out: u64,
	pub gas_estimate: u64,
	pub base_fee: u64,
	pub priority_fee: u64,
	pub max_fee_per_gas: u64,
	pub safety_margin: u64,
	pub total_cost: u64,
	pub destination_address: Address,
	pub source_chain: String,
	pub destination_chain: String,
	pub created_at: u64,
	pub expires_at: u64,
	pub status: QuoteStatus,
}

impl Quote {
	/// `locked = amount_out + gas_budget`, the reservation this quote holds in C4.
	pub fn gas_budget(&self) -> u64 {
		self.max_fee_per_gas.saturating_mul(self.gas_estimate)
	}

	pub fn reserved_amount(&self) -> u64 {
		self.amount_out.saturating_add(self.gas_budget())
	}

	pub fn is_expired(&self, now: u64) -> bool {
		now >= self.expires_at
	}
}

/// Status of a Settlement state machine instance (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
	Pending,
	Executing,
	Completed,
	Failed,
}

/// The state machine record for one on-chain delivery attempt tied to a Quote (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
	pub id: BridgeId,
	pub quote_id: BridgeId,
	pub user: String,
	pub amount: u64,
	pub destination_address: Address,
	pub destination_chain: String,
	pub payment_proof: String,
	pub created_at: u64,
	pub status: SettlementStatus,
	pub gas_used: Option<u64>,
	pub transaction_hash: Option<TransactionHash>,
	pub retry_count: u32,
	pub last_error: Option<String>,
	pub nonce: Option<u64>,
}

impl Settlement {
	pub fn is_terminal(&self) -> bool {
		matches!(
			self.status,
			SettlementStatus::Completed | SettlementStatus::Failed
		)
	}
}

/// Status of a source-side paid flow linking an `icp_payment_id` to a settlement (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTransactionStatus {
	Pending,
	Processing,
	Completed,
	Failed,
	Refunded,
}

/// Higher-level record of a user-initiated bridge flow paid on the source chain (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTransaction {
	pub id: BridgeId,
	pub user: String,
	pub icp_payment_id: String,
	pub settlement_id: Option<BridgeId>,
	pub amount_source: u64,
	pub amount_eth: u64,
	pub gas_sponsored: u64,
	pub status: UserTransactionStatus,
	pub created_at: u64,
}

/// Derived health of the Reserve (§4.4), recomputed from `available` and the
/// configured thresholds on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReserveHealth {
	Healthy,
	Warning,
	Critical,
	Emergency,
}

/// The bridge-owned destination-chain liquidity pool (§3). There is exactly one
/// instance per service; all mutations funnel through `bridge-reserve`'s single
/// critical section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reserve {
	pub balance: u64,
	pub locked: u64,
	pub threshold_warning: u64,
	pub threshold_critical: u64,
	pub daily_limit: u64,
	pub daily_used: u64,
	pub day_anchor_timestamp: u64,
	pub paused: bool,
	pub last_topup: Option<u64>,
}

impl Reserve {
	pub fn available(&self) -> u64 {
		self.balance.saturating_sub(self.locked)
	}

	/// `Healthy` if `available > threshold_warning`; `Warning` if `>
	/// threshold_critical`; `Critical` if `> 0`; `Emergency` if 0 or paused (§4.4).
	pub fn health(&self) -> ReserveHealth {
		if self.paused || self.available() == 0 {
			return ReserveHealth::Emergency;
		}
		if self.available() > self.threshold_warning {
			ReserveHealth::Healthy
		} else if self.available() > self.threshold_critical {
			ReserveHealth::Warning
		} else {
			ReserveHealth::Critical
		}
	}
}

/// One provider's quoted USD price for an asset, before aggregation (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
	pub asset: String,
	pub source_name: String,
	pub price_usd: f64,
	pub confidence: f64,
	pub fetched_at: u64,
}

/// Aggregated price view over `PriceSample`s for one asset (§3, §4.2): the
/// highest-confidence sample fresher than 60 s, or the last cached sample
/// marked `stale` if none qualifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceData {
	pub asset: String,
	pub price_usd: f64,
	pub confidence: f64,
	pub fetched_at: u64,
	pub stale: bool,
}

/// Health-tracked state of one RPC endpoint in the failover pool (§3, §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEndpoint {
	pub url: String,
	pub weight: u32,
	pub healthy: bool,
	pub last_latency_ms: Option<u64>,
	pub failure_count: u32,
	pub cooldown_until: Option<u64>,
}

impl RpcEndpoint {
	pub fn new(url: impl Into<String>, weight: u32) -> Self {
		Self {
			url: url.into(),
			weight,
			healthy: true,
			last_latency_ms: None,
			failure_count: 0,
			cooldown_until: None,
		}
	}

	pub fn is_available(&self, now: u64) -> bool {
		self.healthy && self.cooldown_until.is_none_or(|until| now >= until)
	}
}

/// One append-only audit record (§3, §4.10). Every mutating operation emits
/// exactly one before returning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
	pub id: BridgeId,
	pub timestamp: u64,
	pub event_type: String,
	pub actor: Option<String>,
	pub admin: Option<String>,
	pub amount: Option<u64>,
	pub tx_hash: Option<TransactionHash>,
	pub details: String,
}

impl AuditEntry {
	pub fn new(event_type: impl Into<String>, details: impl Into<String>, now: u64) -> Self {
		Self {
			id: BridgeId::generate(),
			timestamp: now,
			event_type: event_type.into(),
			actor: None,
			admin: None,
			amount: None,
			tx_hash: None,
			details: details.into(),
		}
	}

	pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
		self.actor = Some(actor.into());
		self
	}

	pub fn with_admin(mut self, admin: impl Into<String>) -> Self {
		self.admin = Some(admin.into());
		self
	}

	pub fn with_amount(mut self, amount: u64) -> Self {
		self.amount = Some(amount);
		self
	}

	pub fn with_tx_hash(mut self, tx_hash: TransactionHash) -> Self {
		self.tx_hash = Some(tx_hash);
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainIdRef(pub ChainId);

#[cfg(test)]
mod tests {
	use super::*;

	fn reserve(balance: u64, locked: u64) -> Reserve {
		Reserve {
			balance,
			locked,
			threshold_warning: 5_000_000_000_000_000_000,
			threshold_critical: 1_000_000_000_000_000_000,
			daily_limit: u64::MAX,
			daily_used: 0,
			day_anchor_timestamp: 0,
			paused: false,
			last_topup: None,
		}
	}

	#[test]
	fn health_healthy_above_warning_threshold() {
		let r = reserve(10_000_000_000_000_000_000, 0);
		assert_eq!(r.health(), ReserveHealth::Healthy);
	}

	#[test]
	fn health_emergency_when_paused() {
		let mut r = reserve(10_000_000_000_000_000_000, 0);
		r.paused = true;
		assert_eq!(r.health(), ReserveHealth::Emergency);
	}

	#[test]
	fn health_emergency_when_exhausted() {
		let r = reserve(100, 100);
		assert_eq!(r.health(), ReserveHealth::Emergency);
	}

	#[test]
	fn health_critical_between_zero_and_critical_threshold() {
		let r = reserve(500_000_000_000_000_000, 0);
		assert_eq!(r.health(), ReserveHealth::Critical);
	}

	#[test]
	fn quote_reserved_amount_includes_gas_budget() {
		let quote = Quote {
			id: BridgeId::generate(),
			user: "user-1".into(),
			amount_requested: 1_000_000_000_000_000_000,
			amount_out: 1_000_000_000_000_000_000,
			gas_estimate: 21_000,
			base_fee: 30_000_000_000,
			priority_fee: 1_000_000_000,
			max_fee_per_gas: 61_000_000_000,
			safety_margin: 0,
			total_cost: 0,
			destination_address: Address::ZERO,
			source_chain: "icp".into(),
			destination_chain: "base-sepolia".into(),
			created_at: 0,
			expires_at: 900,
			status: QuoteStatus::Active,
		};
		assert_eq!(quote.gas_budget(), 61_000_000_000 * 21_000);
		assert_eq!(
			quote.reserved_amount(),
			1_000_000_000_000_000_000 + 61_000_000_000 * 21_000
		);
	}
}
