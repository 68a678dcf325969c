//! Fixed/override price source for tests and local development.

use crate::{PriceSourceFactory, PriceSourceInterface, PriceSourceRegistry};
use async_trait::async_trait;
use bridge_types::validation::ValidationError;
use bridge_types::{current_timestamp, ConfigSchema, ImplementationRegistry, PriceError, PriceSample};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedPriceConfig {
	#[serde(default)]
	pub prices: HashMap<String, f64>,
	#[serde(default = "default_fallback")]
	pub fallback_price_usd: f64,
}

fn default_fallback() -> f64 {
	1.0
}

impl Default for FixedPriceConfig {
	fn default() -> Self {
		Self {
			prices: HashMap::new(),
			fallback_price_usd: default_fallback(),
		}
	}
}

impl ConfigSchema for FixedPriceConfig {
	fn validate(&self, _config: &toml::value::Value) -> Result<(), ValidationError> {
		if self.fallback_price_usd <= 0.0 {
			return Err(ValidationError::InvalidValue {
				field: "fallback_price_usd".to_string(),
				message: "must be positive".to_string(),
			});
		}
		Ok(())
	}
}

pub struct FixedPriceSource {
	config: FixedPriceConfig,
}

impl FixedPriceSource {
	pub fn new(config: FixedPriceConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl PriceSourceInterface for FixedPriceSource {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(self.config.clone())
	}

	async fn fetch(&self, asset: &str) -> Result<PriceSample, PriceError> {
		let price_usd = self
			.config
			.prices
			.get(asset)
			.copied()
			.unwrap_or(self.config.fallback_price_usd);

		Ok(PriceSample {
			asset: asset.to_string(),
			source_name: "fixed".to_string(),
			price_usd,
			confidence: 0.5,
			fetched_at: current_timestamp(),
		})
	}
}

pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "fixed";
	type Factory = PriceSourceFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn PriceSourceInterface>, PriceError> {
			let parsed: FixedPriceConfig = config
				.clone()
				.try_into()
				.map_err(|e| PriceError::Unavailable(format!("invalid fixed source config: {e}")))?;
			Ok(Box::new(FixedPriceSource::new(parsed)))
		}
	}
}

impl PriceSourceRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn returns_override_when_present() {
		let mut prices = HashMap::new();
		prices.insert("ETH".to_string(), 2500.0);
		let source = FixedPriceSource::new(FixedPriceConfig {
			prices,
			fallback_price_usd: 1.0,
		});
		let sample = source.fetch("ETH").await.unwrap();
		assert_eq!(sample.price_usd, 2500.0);
	}

	#[tokio::test]
	async fn falls_back_for_unknown_asset() {
		let source = FixedPriceSource::new(FixedPriceConfig::default());
		let sample = source.fetch("DOGE").await.unwrap();
		assert_eq!(sample.price_usd, 1.0);
	}
}
