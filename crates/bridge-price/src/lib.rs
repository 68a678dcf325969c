//! Price feed module for the settlement bridge.
//!
//! Aggregates USD prices for the source asset and ETH from 2+ HTTP sources
//! fetched in parallel, each with a short timeout, and follows the same
//! trait-based pattern as the rest of the bridge.

use async_trait::async_trait;
use bridge_types::{ConfigSchema, ImplementationRegistry, PriceData, PriceError, PriceSample};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

pub mod implementations {
	pub mod coingecko;
	pub mod fixed;
}

const FRESHNESS_SECONDS: u64 = 60;
const CACHE_TTL_SECONDS: u64 = 30;
const SOURCE_TIMEOUT: Duration = Duration::from_secs(3);

/// A single price source.
#[async_trait]
pub trait PriceSourceInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the current USD price of `asset` from this source.
	async fn fetch(&self, asset: &str) -> Result<PriceSample, PriceError>;
}

pub type PriceSourceFactory = fn(&toml::Value) -> Result<Box<dyn PriceSourceInterface>, PriceError>;

pub trait PriceSourceRegistry: ImplementationRegistry<Factory = PriceSourceFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, PriceSourceFactory)> {
	use implementations::{coingecko, fixed};

	vec![
		(coingecko::Registry::NAME, coingecko::Registry::factory()),
		(fixed::Registry::NAME, fixed::Registry::factory()),
	]
}

struct CachedPrice {
	data: PriceData,
}

/// Aggregates 2+ sources per asset with a 30 s internal cache and a
/// stale-fallback path, per §4.2.
pub struct PriceFeedService {
	sources: Vec<Arc<dyn PriceSourceInterface>>,
	cache: Mutex<HashMap<String, CachedPrice>>,
}

impl PriceFeedService {
	pub fn new(sources: Vec<Arc<dyn PriceSourceInterface>>) -> Result<Self, PriceError> {
		if sources.len() < 2 {
			return Err(PriceError::Unavailable(
				"at least two price sources are required".into(),
			));
		}
		Ok(Self {
			sources,
			cache: Mutex::new(HashMap::new()),
		})
	}

	/// Returns the highest-confidence sample fresher than 60 s, or the last
	/// cached sample marked `stale` if none qualifies, per §4.2.
	pub async fn price(&self, asset: &str) -> Result<PriceData, PriceError> {
		{
			let cache = self.cache.lock().await;
			if let Some(cached) = cache.get(asset) {
				if bridge_types::current_timestamp().saturating_sub(cached.data.fetched_at)
					< CACHE_TTL_SECONDS
				{
					return Ok(cached.data.clone());
				}
			}
		}

		let fetches = self.sources.iter().map(|source| {
			let source = Arc::clone(source);
			let asset = asset.to_string();
			async move { tokio::time::timeout(SOURCE_TIMEOUT, source.fetch(&asset)).await }
		});

		let results = futures::future::join_all(fetches).await;
		let now = bridge_types::current_timestamp();

		let best_fresh = results
			.into_iter()
			.filter_map(|r| match r {
				Ok(Ok(sample)) => Some(sample),
				Ok(Err(e)) => {
					warn!(asset, error = %e, "price source returned an error");
					None
				}
				Err(_) => {
					warn!(asset, "price source timed out");
					None
				}
			})
			.filter(|sample| now.saturating_sub(sample.fetched_at) < FRESHNESS_SECONDS)
			.max_by(|a, b| a.confidence.total_cmp(&b.confidence));

		let data = match best_fresh {
			Some(sample) => PriceData {
				asset: sample.asset,
				price_usd: sample.price_usd,
				confidence: sample.confidence,
				fetched_at: sample.fetched_at,
				stale: false,
			},
			None => {
				let cache = self.cache.lock().await;
				match cache.get(asset) {
					Some(cached) => PriceData {
						stale: true,
						..cached.data.clone()
					},
					None => {
						return Err(PriceError::Unavailable(format!(
							"no fresh or cached sample for {asset}"
						)))
					}
				}
			}
		};

		if !data.stale {
			let mut cache = self.cache.lock().await;
			cache.insert(
				asset.to_string(),
				CachedPrice {
					data: data.clone(),
				},
			);
		}

		Ok(data)
	}

	/// Convenience for the quote engine: both the source asset and ETH must
	/// have a usable sample or the engine refuses to issue quotes (§4.2).
	pub async fn price_pair(&self, asset: &str) -> Result<(PriceData, PriceData), PriceError> {
		let source = self.price(asset).await?;
		let eth = self.price("ETH").await?;
		Ok((source, eth))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;

	struct StubSource {
		price: f64,
		confidence: f64,
	}

	#[async_trait]
	impl PriceSourceInterface for StubSource {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(implementations::fixed::FixedPriceConfig::default())
		}

		async fn fetch(&self, asset: &str) -> Result<PriceSample, PriceError> {
			Ok(PriceSample {
				asset: asset.to_string(),
				source_name: "stub".into(),
				price_usd: self.price,
				confidence: self.confidence,
				fetched_at: bridge_types::current_timestamp(),
			})
		}
	}

	#[tokio::test]
	async fn picks_highest_confidence_fresh_sample() {
		let service = PriceFeedService::new(vec![
			Arc::new(StubSource {
				price: 100.0,
				confidence: 0.5,
			}),
			Arc::new(StubSource {
				price: 101.0,
				confidence: 0.9,
			}),
		])
		.unwrap();

		let data = service.price("ETH").await.unwrap();
		assert_eq!(data.price_usd, 101.0);
		assert!(!data.stale);
	}

	#[tokio::test]
	async fn rejects_fewer_than_two_sources() {
		let result = PriceFeedService::new(vec![Arc::new(StubSource {
			price: 1.0,
			confidence: 1.0,
		})]);
		assert!(result.is_err());
	}
}
