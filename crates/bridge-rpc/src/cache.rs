//! Read-through cache for JSON-RPC results, bounded at 4096 entries per the
//! §9 design note. Each method gets its own TTL: `chainId` is immutable for a
//! running chain and cached forever, fee/gas data is cached briefly, nonces
//! are cached barely at all, and state-changing calls are never cached.

use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;

const CAPACITY: usize = 4096;

#[derive(Clone, Copy)]
pub enum Ttl {
	Forever,
	Millis(u64),
	Never,
}

/// TTL policy per JSON-RPC method, per §4.1: gas and fee data is volatile but
/// short-lived, nonces change quickly, chain id never changes, and anything
/// that mutates chain state must never be served from cache.
pub fn ttl_for_method(method: &str) -> Ttl {
	match method {
		"eth_chainId" => Ttl::Forever,
		"eth_gasPrice" | "eth_feeHistory" => Ttl::Millis(15_000),
		"eth_getTransactionCount" => Ttl::Millis(2_000),
		"eth_getBalance" => Ttl::Millis(5_000),
		"eth_getTransactionReceipt" => Ttl::Millis(30_000),
		"eth_sendRawTransaction" => Ttl::Never,
		_ => Ttl::Never,
	}
}

struct CacheEntry {
	value: Value,
	inserted_at: Instant,
	ttl: Ttl,
}

impl CacheEntry {
	fn is_fresh(&self, now: Instant) -> bool {
		match self.ttl {
			Ttl::Forever => true,
			Ttl::Never => false,
			Ttl::Millis(ms) => now.duration_since(self.inserted_at) < Duration::from_millis(ms),
		}
	}
}

pub struct RpcCache {
	entries: LruCache<String, CacheEntry>,
	hits: u64,
	misses: u64,
}

impl RpcCache {
	pub fn new() -> Self {
		Self {
			entries: LruCache::new(NonZeroUsize::new(CAPACITY).expect("capacity is nonzero")),
			hits: 0,
			misses: 0,
		}
	}

	pub fn key(method: &str, params: &Value) -> String {
		format!("{method}:{params}")
	}

	pub fn get(&mut self, key: &str) -> Option<Value> {
		let now = Instant::now();
		if let Some(entry) = self.entries.get(key) {
			if entry.is_fresh(now) {
				self.hits += 1;
				return Some(entry.value.clone());
			}
		}
		self.misses += 1;
		None
	}

	pub fn put(&mut self, key: String, value: Value, ttl: Ttl) {
		if matches!(ttl, Ttl::Never) {
			return;
		}
		self.entries.put(
			key,
			CacheEntry {
				value,
				inserted_at: Instant::now(),
				ttl,
			},
		);
	}

	pub fn invalidate(&mut self, key: &str) {
		self.entries.pop(key);
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn hit_ratio(&self) -> f64 {
		let total = self.hits + self.misses;
		if total == 0 {
			0.0
		} else {
			self.hits as f64 / total as f64
		}
	}

	pub fn hits(&self) -> u64 {
		self.hits
	}

	pub fn misses(&self) -> u64 {
		self.misses
	}
}

impl Default for RpcCache {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn forever_entries_never_expire() {
		let mut cache = RpcCache::new();
		let key = RpcCache::key("eth_chainId", &json!([]));
		cache.put(key.clone(), json!("0x1"), Ttl::Forever);
		assert_eq!(cache.get(&key), Some(json!("0x1")));
	}

	#[test]
	fn never_ttl_is_not_stored() {
		let mut cache = RpcCache::new();
		let key = RpcCache::key("eth_sendRawTransaction", &json!(["0xdead"]));
		cache.put(key.clone(), json!("0xhash"), Ttl::Never);
		assert_eq!(cache.get(&key), None);
	}

	#[test]
	fn hit_ratio_tracks_hits_and_misses() {
		let mut cache = RpcCache::new();
		let key = RpcCache::key("eth_chainId", &json!([]));
		cache.get(&key);
		cache.put(key.clone(), json!("0x1"), Ttl::Forever);
		cache.get(&key);
		assert_eq!(cache.hits(), 1);
		assert_eq!(cache.misses(), 1);
		assert!((cache.hit_ratio() - 0.5).abs() < f64::EPSILON);
	}
}
