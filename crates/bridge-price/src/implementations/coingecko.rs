//! CoinGecko-shaped HTTP price source. Queries the public simple-price
//! endpoint and reports a fixed confidence for samples that parse cleanly.

use crate::{PriceSourceFactory, PriceSourceInterface, PriceSourceRegistry};
use async_trait::async_trait;
use bridge_types::validation::ValidationError;
use bridge_types::{current_timestamp, ConfigSchema, ImplementationRegistry, PriceError, PriceSample};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoingeckoConfig {
	#[serde(default = "default_base_url")]
	pub base_url: String,
	/// Maps our asset symbols (e.g. "ETH") to CoinGecko coin ids (e.g. "ethereum").
	#[serde(default = "default_coin_ids")]
	pub coin_ids: HashMap<String, String>,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
}

fn default_base_url() -> String {
	"https://api.coingecko.com/api/v3".to_string()
}

fn default_coin_ids() -> HashMap<String, String> {
	let mut m = HashMap::new();
	m.insert("ETH".to_string(), "ethereum".to_string());
	m
}

fn default_timeout_ms() -> u64 {
	3000
}

impl Default for CoingeckoConfig {
	fn default() -> Self {
		Self {
			base_url: default_base_url(),
			coin_ids: default_coin_ids(),
			timeout_ms: default_timeout_ms(),
		}
	}
}

impl ConfigSchema for CoingeckoConfig {
	fn validate(&self, _config: &toml::value::Value) -> Result<(), ValidationError> {
		if self.base_url.is_empty() {
			return Err(ValidationError::MissingField("base_url".to_string()));
		}
		Ok(())
	}
}

pub struct CoingeckoSource {
	config: CoingeckoConfig,
	client: reqwest::Client,
}

impl CoingeckoSource {
	pub fn new(config: CoingeckoConfig) -> Self {
		Self {
			client: reqwest::Client::new(),
			config,
		}
	}
}

#[async_trait]
impl PriceSourceInterface for CoingeckoSource {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(self.config.clone())
	}

	async fn fetch(&self, asset: &str) -> Result<PriceSample, PriceError> {
		let coin_id = self
			.config
			.coin_ids
			.get(asset)
			.ok_or_else(|| PriceError::Unavailable(format!("no coingecko mapping for {asset}")))?;

		let url = format!(
			"{}/simple/price?ids={}&vs_currencies=usd",
			self.config.base_url, coin_id
		);

		let response = self
			.client
			.get(&url)
			.timeout(Duration::from_millis(self.config.timeout_ms))
			.send()
			.await
			.map_err(|e| PriceError::Unavailable(e.to_string()))?;

		if !response.status().is_success() {
			return Err(PriceError::Unavailable(format!(
				"coingecko returned status {}",
				response.status()
			)));
		}

		let body: HashMap<String, HashMap<String, f64>> = response
			.json()
			.await
			.map_err(|e| PriceError::Unavailable(format!("malformed coingecko response: {e}")))?;

		let price_usd = body
			.get(coin_id)
			.and_then(|m| m.get("usd"))
			.copied()
			.ok_or_else(|| PriceError::Unavailable(format!("no usd price for {coin_id}")))?;

		Ok(PriceSample {
			asset: asset.to_string(),
			source_name: "coingecko".to_string(),
			price_usd,
			confidence: 0.9,
			fetched_at: current_timestamp(),
		})
	}
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "coingecko";
	type Factory = PriceSourceFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn PriceSourceInterface>, PriceError> {
			let parsed: CoingeckoConfig = config
				.clone()
				.try_into()
				.map_err(|e| PriceError::Unavailable(format!("invalid coingecko config: {e}")))?;
			Ok(Box::new(CoingeckoSource::new(parsed)))
		}
	}
}

impl PriceSourceRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_unmapped_asset_before_issuing_a_request() {
		let config = CoingeckoConfig {
			coin_ids: HashMap::new(),
			..CoingeckoConfig::default()
		};
		let source = CoingeckoSource::new(config);
		let result = tokio::runtime::Runtime::new()
			.unwrap()
			.block_on(source.fetch("ETH"));
		assert!(result.is_err());
	}
}
