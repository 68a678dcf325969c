//! Reserve Manager: single-writer critical section guarding the `Reserve`
//! record so that `locked <= balance` always holds. Uses a single
//! `tokio::sync::Mutex` around the shared mutable state rather than
//! lock-free structures, since there is exactly one reserve to guard.

use bridge_types::{current_timestamp, AdminError, Reserve, ReserveError, ReserveHealth};
use tokio::sync::Mutex;

const SECONDS_PER_DAY: u64 = 86_400;

pub struct ReserveManager {
	state: Mutex<Reserve>,
}

impl ReserveManager {
	pub fn new(initial: Reserve) -> Self {
		Self {
			state: Mutex::new(initial),
		}
	}

	/// Rolls `daily_used` back to zero if the wall clock has crossed a new
	/// UTC day boundary since `day_anchor_timestamp`, detected lazily on
	/// every mutation per §4.4.
	fn maybe_reset_daily_usage(reserve: &mut Reserve, now: u64) {
		if now / SECONDS_PER_DAY != reserve.day_anchor_timestamp / SECONDS_PER_DAY {
			reserve.daily_used = 0;
			reserve.day_anchor_timestamp = now;
		}
	}

	pub async fn lock(&self, amount: u64) -> Result<(), ReserveError> {
		let mut reserve = self.state.lock().await;
		let now = current_timestamp();
		Self::maybe_reset_daily_usage(&mut reserve, now);

		if reserve.paused {
			return Err(ReserveError::Paused);
		}
		if reserve.daily_used + amount > reserve.daily_limit {
			return Err(ReserveError::DailyLimitExceeded {
				used: reserve.daily_used,
				requested: amount,
				limit: reserve.daily_limit,
			});
		}
		if reserve.available() < amount {
			return Err(ReserveError::Insufficient {
				requested: amount,
				available: reserve.available(),
			});
		}

		reserve.locked += amount;
		Ok(())
	}

	/// Releases a previously locked amount. Idempotent on zero and never
	/// fails: an expired or failed-pre-settlement quote simply gives back
	/// whatever it reserved, per §4.4.
	pub async fn unlock(&self, amount: u64) {
		let mut reserve = self.state.lock().await;
		reserve.locked = reserve.locked.saturating_sub(amount);
	}

	pub async fn commit(&self, amount: u64) {
		let mut reserve = self.state.lock().await;
		let now = current_timestamp();
		Self::maybe_reset_daily_usage(&mut reserve, now);

		reserve.balance = reserve.balance.saturating_sub(amount);
		reserve.locked = reserve.locked.saturating_sub(amount);
		reserve.daily_used += amount;
	}

	pub async fn topup(&self, is_admin: bool, amount: u64) -> Result<(), AdminError> {
		if !is_admin {
			return Err(AdminError::NotAdmin);
		}
		let mut reserve = self.state.lock().await;
		reserve.balance += amount;
		reserve.last_topup = Some(current_timestamp());
		Ok(())
	}

	pub async fn set_thresholds(
		&self,
		is_admin: bool,
		warning: u64,
		critical: u64,
	) -> Result<(), AdminError> {
		if !is_admin {
			return Err(AdminError::NotAdmin);
		}
		let mut reserve = self.state.lock().await;
		reserve.threshold_warning = warning;
		reserve.threshold_critical = critical;
		Ok(())
	}

	pub async fn set_daily_limit(&self, is_admin: bool, limit: u64) -> Result<(), AdminError> {
		if !is_admin {
			return Err(AdminError::NotAdmin);
		}
		let mut reserve = self.state.lock().await;
		reserve.daily_limit = limit;
		Ok(())
	}

	pub async fn pause(&self, is_admin: bool) -> Result<(), AdminError> {
		if !is_admin {
			return Err(AdminError::NotAdmin);
		}
		self.state.lock().await.paused = true;
		Ok(())
	}

	pub async fn unpause(&self, is_admin: bool) -> Result<(), AdminError> {
		if !is_admin {
			return Err(AdminError::NotAdmin);
		}
		self.state.lock().await.paused = false;
		Ok(())
	}

	pub async fn health(&self) -> ReserveHealth {
		self.state.lock().await.health()
	}

	pub async fn snapshot(&self) -> Reserve {
		self.state.lock().await.clone()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn reserve(balance: u64, daily_limit: u64) -> Reserve {
		Reserve {
			balance,
			locked: 0,
			threshold_warning: 100,
			threshold_critical: 10,
			daily_limit,
			daily_used: 0,
			day_anchor_timestamp: current_timestamp(),
			paused: false,
			last_topup: None,
		}
	}

	#[tokio::test]
	async fn lock_then_commit_reduces_balance_and_locked() {
		let manager = ReserveManager::new(reserve(1_000, 1_000));
		manager.lock(200).await.unwrap();
		manager.commit(200).await;
		let snap = manager.snapshot().await;
		assert_eq!(snap.balance, 800);
		assert_eq!(snap.locked, 0);
		assert_eq!(snap.daily_used, 200);
	}

	#[tokio::test]
	async fn lock_rejects_amount_above_available() {
		let manager = ReserveManager::new(reserve(100, 1_000));
		let err = manager.lock(200).await.unwrap_err();
		assert!(matches!(err, ReserveError::Insufficient { .. }));
	}

	#[tokio::test]
	async fn lock_rejects_when_paused() {
		let manager = ReserveManager::new(reserve(1_000, 1_000));
		manager.pause(true).await.unwrap();
		let err = manager.lock(10).await.unwrap_err();
		assert!(matches!(err, ReserveError::Paused));
	}

	#[tokio::test]
	async fn lock_rejects_above_daily_limit() {
		let manager = ReserveManager::new(reserve(1_000, 50));
		let err = manager.lock(100).await.unwrap_err();
		assert!(matches!(err, ReserveError::DailyLimitExceeded { .. }));
	}

	#[tokio::test]
	async fn unlock_is_idempotent_on_zero() {
		let manager = ReserveManager::new(reserve(1_000, 1_000));
		manager.unlock(0).await;
		let snap = manager.snapshot().await;
		assert_eq!(snap.locked, 0);
	}

	#[tokio::test]
	async fn non_admin_cannot_topup_or_pause() {
		let manager = ReserveManager::new(reserve(1_000, 1_000));
		assert!(matches!(
			manager.topup(false, 10).await,
			Err(AdminError::NotAdmin)
		));
		assert!(matches!(
			manager.pause(false).await,
			Err(AdminError::NotAdmin)
		));
	}

	#[tokio::test]
	async fn health_reflects_available_against_thresholds() {
		let manager = ReserveManager::new(reserve(1_000, 1_000));
		assert_eq!(manager.health().await, ReserveHealth::Healthy);
		manager.lock(950).await.unwrap();
		assert_eq!(manager.health().await, ReserveHealth::Critical);
	}
}
