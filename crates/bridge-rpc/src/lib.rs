//! EVM JSON-RPC client: a pool of endpoints with health/weight/cooldown
//! failover, a read-through cache with per-method TTLs, and the small set of
//! chain reads and writes the rest of the bridge needs. Dispatches over
//! `reqwest` directly rather than alloy's provider/transport stack.

mod cache;
mod endpoint;
mod jsonrpc;

use std::sync::Arc;
use std::time::{Duration, Instant};

use bridge_types::{Address, RpcError, RpcEndpoint, TransactionHash, TransactionReceipt};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use cache::{RpcCache, Ttl};
use endpoint::EndpointPool;

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// `eth_feeHistory` result, trimmed to the fields §4.3's gas estimator needs.
#[derive(Debug, Clone)]
pub struct FeeHistory {
	pub oldest_block: u64,
	pub base_fee_per_gas: Vec<u64>,
	pub reward: Vec<Vec<u64>>,
}

#[derive(Debug, Clone)]
pub struct RpcStats {
	pub cache_hits: u64,
	pub cache_misses: u64,
	pub cache_hit_ratio: f64,
	pub endpoints: Vec<RpcEndpoint>,
	pub last_seen_block: Option<u64>,
}

struct Inner {
	pool: EndpointPool,
	cache: RpcCache,
	last_seen_block: Option<u64>,
}

/// Shared handle to a chain's RPC pool. Cheap to clone; all mutable state
/// (endpoint health, cache) lives behind a single mutex since call volume is
/// not latency-critical enough to warrant finer-grained locking (§5).
#[derive(Clone)]
pub struct RpcClient {
	http: reqwest::Client,
	inner: Arc<Mutex<Inner>>,
}

impl RpcClient {
	pub fn new(urls: impl IntoIterator<Item = String>) -> Result<Self, RpcError> {
		let pool = EndpointPool::new(urls);
		if pool.is_empty() {
			return Err(RpcError::AllEndpointsDown);
		}
		Ok(Self {
			http: reqwest::Client::new(),
			inner: Arc::new(Mutex::new(Inner {
				pool,
				cache: RpcCache::new(),
				last_seen_block: None,
			})),
		})
	}

	/// Tries each endpoint in priority order, serving from cache first when
	/// the method's TTL allows it. Per §4.1, a call only fails with
	/// `AllEndpointsDown` once every configured endpoint has been attempted.
	async fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
		let key = RpcCache::key(method, &params);
		let ttl = cache::ttl_for_method(method);

		{
			let mut inner = self.inner.lock().await;
			if let Some(cached) = inner.cache.get(&key) {
				return Ok(cached);
			}
		}

		let order = {
			let inner = self.inner.lock().await;
			inner.pool.order()
		};

		let mut last_err = RpcError::AllEndpointsDown;
		for index in order {
			let url = {
				let inner = self.inner.lock().await;
				inner.pool.url(index).to_string()
			};

			let started = Instant::now();
			match jsonrpc::call(&self.http, &url, method, params.clone(), CALL_TIMEOUT).await {
				Ok(value) => {
					let mut inner = self.inner.lock().await;
					inner.pool.record_success(index, started.elapsed());
					inner.cache.put(key, value.clone(), ttl);
					debug!(method, url, "rpc call succeeded");
					return Ok(value);
				}
				Err(err) => {
					warn!(method, url, error = %err, "rpc call failed");
					let mut inner = self.inner.lock().await;
					inner.pool.record_failure(index);
					last_err = err;
				}
			}
		}

		Err(last_err)
	}

	pub async fn chain_id(&self) -> Result<u64, RpcError> {
		let value = self.dispatch("eth_chainId", json!([])).await?;
		parse_hex_u64(&value)
	}

	pub async fn gas_price(&self) -> Result<u64, RpcError> {
		let value = self.dispatch("eth_gasPrice", json!([])).await?;
		parse_hex_u64(&value)
	}

	pub async fn fee_history(&self, n_blocks: u64) -> Result<FeeHistory, RpcError> {
		let value = self
			.dispatch(
				"eth_feeHistory",
				json!([format!("0x{:x}", n_blocks), "latest", [50]]),
			)
			.await?;

		let oldest_block = value
			.get("oldestBlock")
			.ok_or_else(|| RpcError::BadResponse("missing oldestBlock".into()))
			.and_then(parse_hex_u64)?;

		let base_fee_per_gas = value
			.get("baseFeePerGas")
			.and_then(Value::as_array)
			.ok_or_else(|| RpcError::BadResponse("missing baseFeePerGas".into()))?
			.iter()
			.map(parse_hex_u64)
			.collect::<Result<Vec<_>, _>>()?;

		let reward = value
			.get("reward")
			.and_then(Value::as_array)
			.map(|rows| {
				rows.iter()
					.map(|row| {
						row.as_array()
							.into_iter()
							.flatten()
							.map(parse_hex_u64)
							.collect::<Result<Vec<_>, _>>()
					})
					.collect::<Result<Vec<_>, _>>()
			})
			.transpose()?
			.unwrap_or_default();

		Ok(FeeHistory {
			oldest_block,
			base_fee_per_gas,
			reward,
		})
	}

	/// Fetches the confirmed nonce via `latest`. The caller is responsible for
	/// flooring this against any in-flight nonce it has already issued;
	/// `pending` is not used here since the node's view of the pending pool
	/// is not safe to rely on under concurrent broadcasts from this process.
	pub async fn nonce(&self, address: Address) -> Result<u64, RpcError> {
		let value = self
			.dispatch(
				"eth_getTransactionCount",
				json!([format!("{address:#x}"), "latest"]),
			)
			.await?;
		parse_hex_u64(&value)
	}

	pub async fn get_balance(&self, address: Address) -> Result<u64, RpcError> {
		let value = self
			.dispatch("eth_getBalance", json!([format!("{address:#x}"), "latest"]))
			.await?;
		parse_hex_u64(&value)
	}

	/// Submits a signed, RLP-encoded transaction. Never cached: this mutates
	/// chain state, and the hash is only meaningful once.
	pub async fn send_raw(&self, tx_bytes: &[u8]) -> Result<TransactionHash, RpcError> {
		let raw = format!("0x{}", hex::encode(tx_bytes));
		let value = self.dispatch("eth_sendRawTransaction", json!([raw])).await?;
		let hash_str = value
			.as_str()
			.ok_or_else(|| RpcError::BadResponse("expected hex string tx hash".into()))?;
		parse_tx_hash(hash_str)
	}

	pub async fn receipt(
		&self,
		tx_hash: TransactionHash,
	) -> Result<Option<TransactionReceipt>, RpcError> {
		let value = self
			.dispatch(
				"eth_getTransactionReceipt",
				json!([tx_hash.to_string()]),
			)
			.await?;

		if value.is_null() {
			return Ok(None);
		}

		let block_number = value
			.get("blockNumber")
			.ok_or_else(|| RpcError::BadResponse("missing blockNumber".into()))
			.and_then(parse_hex_u64)?;
		let status = value
			.get("status")
			.ok_or_else(|| RpcError::BadResponse("missing status".into()))
			.and_then(parse_hex_u64)?
			== 1;
		let gas_used = value
			.get("gasUsed")
			.ok_or_else(|| RpcError::BadResponse("missing gasUsed".into()))
			.and_then(parse_hex_u64)?;
		let effective_gas_price = value
			.get("effectiveGasPrice")
			.ok_or_else(|| RpcError::BadResponse("missing effectiveGasPrice".into()))
			.and_then(parse_hex_u64)?;

		{
			let mut inner = self.inner.lock().await;
			inner.last_seen_block = Some(inner.last_seen_block.unwrap_or(0).max(block_number));
		}

		Ok(Some(TransactionReceipt {
			transaction_hash: tx_hash,
			block_number,
			status,
			gas_used,
			effective_gas_price,
		}))
	}

	/// Drops every cached entry, per the `clear_rpc_cache` admin/cache op (§6).
	pub async fn clear_cache(&self) {
		let mut inner = self.inner.lock().await;
		inner.cache.clear();
	}

	pub async fn stats(&self) -> RpcStats {
		let inner = self.inner.lock().await;
		RpcStats {
			cache_hits: inner.cache.hits(),
			cache_misses: inner.cache.misses(),
			cache_hit_ratio: inner.cache.hit_ratio(),
			endpoints: inner.pool.snapshot(),
			last_seen_block: inner.last_seen_block,
		}
	}
}

fn parse_hex_u64(value: &Value) -> Result<u64, RpcError> {
	let s = value
		.as_str()
		.ok_or_else(|| RpcError::BadResponse(format!("expected hex string, got {value}")))?;
	u64::from_str_radix(s.trim_start_matches("0x"), 16)
		.map_err(|e| RpcError::BadResponse(format!("invalid hex integer {s}: {e}")))
}

fn parse_tx_hash(s: &str) -> Result<TransactionHash, RpcError> {
	let bytes = hex::decode(s.trim_start_matches("0x"))
		.map_err(|e| RpcError::BadResponse(format!("invalid tx hash {s}: {e}")))?;
	let array: [u8; 32] = bytes
		.try_into()
		.map_err(|_| RpcError::BadResponse(format!("tx hash {s} is not 32 bytes")))?;
	Ok(TransactionHash::new(array))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_hex_u64_handles_prefixed_values() {
		assert_eq!(parse_hex_u64(&json!("0x1a")).unwrap(), 26);
	}

	#[test]
	fn parse_hex_u64_rejects_non_string() {
		assert!(parse_hex_u64(&json!(26)).is_err());
	}

	#[tokio::test]
	async fn new_rejects_empty_endpoint_list() {
		let result = RpcClient::new(Vec::<String>::new());
		assert!(matches!(result, Err(RpcError::AllEndpointsDown)));
	}
}
