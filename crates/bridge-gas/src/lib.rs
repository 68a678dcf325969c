//! Gas estimator: turns `eth_feeHistory` into an EIP-1559 fee plan plus a
//! per-call-type gas estimate with a safety margin, built on `bridge-rpc`'s
//! `FeeHistory` shape and a percentile/margin fee-estimation style.

use std::time::Duration;

use bridge_rpc::{FeeHistory, RpcClient};
use bridge_types::RpcError;
use tokio::sync::RwLock;

const FEE_HISTORY_BLOCKS: u64 = 20;
const PRIORITY_FEE_PERCENTILE: usize = 60;
const MIN_PRIORITY_FEE_WEI: u64 = 1_000_000_000; // 1 gwei floor

/// The kind of on-chain call a quote is budgeting gas for. Plain transfers
/// are the common case; calldata-carrying settlements cost more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
	PlainTransfer,
	WithCalldata,
}

impl CallKind {
	fn base_gas_units(self) -> u64 {
		match self {
			CallKind::PlainTransfer => 21_000,
			CallKind::WithCalldata => 65_000,
		}
	}
}

/// A fee plan for one call, derived from the most recent `fee_history` per
/// §4.3's formulas.
#[derive(Debug, Clone, Copy)]
pub struct GasPlan {
	pub base_fee: u64,
	pub priority_fee: u64,
	pub max_fee_per_gas: u64,
	pub gas_estimate: u64,
}

impl GasPlan {
	pub fn gas_budget(&self) -> u128 {
		self.max_fee_per_gas as u128 * self.gas_estimate as u128
	}
}

struct CachedPlan {
	plan: GasPlan,
	fetched_at: std::time::Instant,
}

/// Caches the last fee plan and forces a re-estimate once it is older than
/// `validity_window / 3`, per §4.3.
pub struct GasEstimator {
	rpc: RpcClient,
	safety_margin_percent: u32,
	min_priority_fee_wei: u64,
	cache: RwLock<Option<CachedPlan>>,
}

impl GasEstimator {
	pub fn new(rpc: RpcClient, safety_margin_percent: u32) -> Self {
		Self {
			rpc,
			safety_margin_percent,
			min_priority_fee_wei: MIN_PRIORITY_FEE_WEI,
			cache: RwLock::new(None),
		}
	}

	/// Returns a fresh or cached base fee plan (gas_estimate/safety margin are
	/// applied separately per call kind in `estimate`).
	async fn base_plan(&self, validity_window: Duration) -> Result<(u64, u64, u64), RpcError> {
		let max_age = validity_window / 3;

		{
			let cache = self.cache.read().await;
			if let Some(cached) = cache.as_ref() {
				if cached.fetched_at.elapsed() < max_age {
					return Ok((
						cached.plan.base_fee,
						cached.plan.priority_fee,
						cached.plan.max_fee_per_gas,
					));
				}
			}
		}

		let history = self.rpc.fee_history(FEE_HISTORY_BLOCKS).await?;
		let (base_fee, priority_fee, max_fee_per_gas) = derive_fees(&history, self.min_priority_fee_wei);

		let mut cache = self.cache.write().await;
		*cache = Some(CachedPlan {
			plan: GasPlan {
				base_fee,
				priority_fee,
				max_fee_per_gas,
				gas_estimate: 0,
			},
			fetched_at: std::time::Instant::now(),
		});

		Ok((base_fee, priority_fee, max_fee_per_gas))
	}

	pub async fn estimate(
		&self,
		call_kind: CallKind,
		validity_window: Duration,
	) -> Result<GasPlan, RpcError> {
		let (base_fee, priority_fee, max_fee_per_gas) = self.base_plan(validity_window).await?;

		let base_units = call_kind.base_gas_units();
		let gas_estimate =
			base_units + (base_units * self.safety_margin_percent as u64) / 100;

		Ok(GasPlan {
			base_fee,
			priority_fee,
			max_fee_per_gas,
			gas_estimate,
		})
	}

	/// Forces the next `estimate` call to refetch `fee_history` rather than
	/// serve the cached plan, per the `invalidate_gas_cache` cache op (§6).
	pub async fn invalidate(&self) {
		let mut cache = self.cache.write().await;
		*cache = None;
	}
}

/// `base_fee = last_base_fee * 1.25`, `priority_fee` = 60th percentile of
/// observed rewards floored at `min_priority_fee_wei`, `max_fee_per_gas =
/// 2*base_fee + priority_fee`.
fn derive_fees(history: &FeeHistory, min_priority_fee_wei: u64) -> (u64, u64, u64) {
	let last_base_fee = history.base_fee_per_gas.last().copied().unwrap_or(0);
	let base_fee = (last_base_fee as f64 * 1.25).round() as u64;

	let mut rewards: Vec<u64> = history
		.reward
		.iter()
		.filter_map(|row| row.first().copied())
		.collect();
	rewards.sort_unstable();

	let priority_fee = if rewards.is_empty() {
		min_priority_fee_wei
	} else {
		let index = (rewards.len() * PRIORITY_FEE_PERCENTILE / 100).min(rewards.len() - 1);
		rewards[index].max(min_priority_fee_wei)
	};

	let max_fee_per_gas = 2 * base_fee + priority_fee;
	(base_fee, priority_fee, max_fee_per_gas)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_history() -> FeeHistory {
		FeeHistory {
			oldest_block: 100,
			base_fee_per_gas: vec![40_000_000_000, 42_000_000_000, 44_000_000_000],
			reward: vec![
				vec![1_000_000_000],
				vec![2_000_000_000],
				vec![3_000_000_000],
				vec![1_500_000_000],
				vec![5_000_000_000],
			],
		}
	}

	#[test]
	fn base_fee_is_scaled_by_1_25() {
		let (base_fee, _, _) = derive_fees(&sample_history(), 1_000_000_000);
		assert_eq!(base_fee, 55_000_000_000);
	}

	#[test]
	fn priority_fee_respects_floor() {
		let history = FeeHistory {
			oldest_block: 1,
			base_fee_per_gas: vec![1_000_000_000],
			reward: vec![vec![1]],
		};
		let (_, priority_fee, _) = derive_fees(&history, 1_000_000_000);
		assert_eq!(priority_fee, 1_000_000_000);
	}

	#[test]
	fn max_fee_is_double_base_plus_priority() {
		let (base_fee, priority_fee, max_fee) = derive_fees(&sample_history(), 1_000_000_000);
		assert_eq!(max_fee, 2 * base_fee + priority_fee);
	}

	#[test]
	fn calldata_calls_cost_more_than_plain_transfers() {
		assert!(CallKind::WithCalldata.base_gas_units() > CallKind::PlainTransfer.base_gas_units());
	}
}
