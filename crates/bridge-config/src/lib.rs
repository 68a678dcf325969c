//! Configuration module for the gasless cross-chain settlement bridge.
//!
//! Loads `BridgeConfig` from TOML, resolving `${VAR}` environment
//! references, and validates it before the engine starts.

use bridge_types::ConfigError as TypesConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur loading or validating the bridge configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("configuration parse error: {0}")]
	Parse(String),
	#[error("configuration validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

impl From<ConfigError> for TypesConfigError {
	fn from(err: ConfigError) -> Self {
		match err {
			ConfigError::Io(e) => TypesConfigError::Io(e.to_string()),
			ConfigError::Parse(msg) => TypesConfigError::Parse(msg),
			ConfigError::Validation(msg) => TypesConfigError::Validation(msg),
		}
	}
}

/// Top-level bridge configuration (§6 "Configuration (`BridgeConfig`)").
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
	pub bridge: BridgeIdentity,
	pub quote: QuoteConfig,
	pub reserve: ReserveConfig,
	pub supported_chains: Vec<ChainConfig>,
	pub storage: StorageConfig,
	pub signer: SignerConfig,
	pub price: PriceConfig,
	pub api: Option<ApiConfig>,
}

/// Identity of this bridge instance and its bootstrap admin (§4.11).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeIdentity {
	pub id: String,
	/// The single bootstrap admin set at initialisation; membership checks for
	/// admin endpoints grow the `admins` set from here.
	pub bootstrap_admin: String,
	pub source_chain: String,
}

/// Quote engine bounds and validity window (§6, §4.5).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuoteConfig {
	pub min_quote_amount: u64,
	pub max_quote_amount: u64,
	#[serde(default = "default_quote_validity_minutes")]
	pub quote_validity_minutes: u64,
	#[serde(default = "default_safety_margin_percent")]
	pub safety_margin_percent: u8,
	/// Circuit breaker: `request_quote` rejects gas estimates above this (wei/gas).
	pub max_gas_price: u64,
}

fn default_quote_validity_minutes() -> u64 {
	15
}

fn default_safety_margin_percent() -> u8 {
	20
}

impl QuoteConfig {
	pub fn validity_seconds(&self) -> u64 {
		self.quote_validity_minutes * 60
	}
}

/// Initial Reserve state and admin-configurable thresholds (§3, §4.4).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReserveConfig {
	pub initial_balance: u64,
	pub threshold_warning: u64,
	pub threshold_critical: u64,
	pub daily_limit: u64,
}

/// One supported destination chain: name, chain id, and its RPC endpoint pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	pub name: String,
	pub chain_id: u64,
	pub rpc_urls: Vec<String>,
}

/// Configuration for the storage backend: a primary implementation name plus
/// a per-backend raw-TOML configuration table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

fn default_cleanup_interval_seconds() -> u64 {
	3600
}

/// Configuration for the threshold signer (C8).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignerConfig {
	pub provider: String,
	pub config: toml::Value,
}

/// Configuration for the price feed (C2): at least two HTTP sources are
/// required so "fresh sample among 2+ sources" (§4.2) is meaningful.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PriceConfig {
	pub sources: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	pub rate_limiting: Option<RateLimitConfig>,
	pub cors: Option<CorsConfig>,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
	pub requests_per_minute: u32,
	pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
	pub allowed_origins: Vec<String>,
}

/// Resolves `${VAR}` / `${VAR:-default}` references in a TOML document
/// before parsing. Input is capped at 1 MiB.
fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).unwrap();
		let var_name = cap.get(1).unwrap().as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"environment variable '{}' not found",
						var_name
					)));
				}
			}
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(*start..*end, value);
	}

	Ok(result)
}

impl BridgeConfig {
	pub fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		let resolved = resolve_env_vars(&content)?;
		resolved.parse()
	}

	/// Validates cross-field invariants that `serde`'s structural parse can't express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.bridge.id.is_empty() {
			return Err(ConfigError::Validation("bridge.id cannot be empty".into()));
		}
		if self.bridge.bootstrap_admin.is_empty() {
			return Err(ConfigError::Validation(
				"bridge.bootstrap_admin cannot be empty".into(),
			));
		}
		if self.quote.min_quote_amount > self.quote.max_quote_amount {
			return Err(ConfigError::Validation(
				"quote.min_quote_amount must be <= quote.max_quote_amount".into(),
			));
		}
		if self.quote.quote_validity_minutes == 0 {
			return Err(ConfigError::Validation(
				"quote.quote_validity_minutes must be > 0".into(),
			));
		}
		if self.quote.safety_margin_percent == 0 {
			return Err(ConfigError::Validation(
				"quote.safety_margin_percent must be > 0".into(),
			));
		}
		if self.reserve.threshold_critical > self.reserve.threshold_warning {
			return Err(ConfigError::Validation(
				"reserve.threshold_critical must be <= reserve.threshold_warning".into(),
			));
		}
		if self.reserve.daily_limit == 0 {
			return Err(ConfigError::Validation(
				"reserve.daily_limit must be > 0".into(),
			));
		}
		if self.supported_chains.is_empty() {
			return Err(ConfigError::Validation(
				"supported_chains cannot be empty".into(),
			));
		}
		for chain in &self.supported_chains {
			if chain.rpc_urls.is_empty() {
				return Err(ConfigError::Validation(format!(
					"chain '{}' must have at least one rpc_url",
					chain.name
				)));
			}
		}
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"at least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.signer.provider.is_empty() {
			return Err(ConfigError::Validation(
				"signer.provider cannot be empty".into(),
			));
		}
		if self.price.sources.len() < 2 {
			return Err(ConfigError::Validation(
				"at least 2 price sources must be configured".into(),
			));
		}
		Ok(())
	}

	/// Looks up a supported chain by name.
	pub fn chain(&self, name: &str) -> Option<&ChainConfig> {
		self.supported_chains.iter().find(|c| c.name == name)
	}
}

impl FromStr for BridgeConfig {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: BridgeConfig = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_toml() -> &'static str {
		r#"
[bridge]
id = "bridge-1"
bootstrap_admin = "admin-user"
source_chain = "icp"

[quote]
min_quote_amount = 1000000000000000
max_quote_amount = 10000000000000000000
quote_validity_minutes = 15
safety_margin_percent = 20
max_gas_price = 500000000000

[reserve]
initial_balance = 50000000000000000000
threshold_warning = 5000000000000000000
threshold_critical = 1000000000000000000
daily_limit = 20000000000000000000

[[supported_chains]]
name = "base-sepolia"
chain_id = 84532
rpc_urls = ["https://sepolia.base.org"]

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]

[signer]
provider = "deterministic"
[signer.config]
private_key = "${TEST_PRIVATE_KEY:-0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff8}"

[price.sources.coingecko]
[price.sources.mock]

[api]
enabled = true
"#
	}

	#[test]
	fn parses_well_formed_config() {
		let config: BridgeConfig = sample_toml().parse().unwrap();
		assert_eq!(config.bridge.id, "bridge-1");
		assert_eq!(config.supported_chains[0].chain_id, 84532);
		assert_eq!(config.quote.validity_seconds(), 900);
	}

	#[test]
	fn rejects_min_above_max_quote_amount() {
		let bad = sample_toml().replace(
			"min_quote_amount = 1000000000000000",
			"min_quote_amount = 99999999999999999999",
		);
		let result: Result<BridgeConfig, _> = bad.parse();
		assert!(result.is_err());
	}

	#[test]
	fn rejects_fewer_than_two_price_sources() {
		let bad = sample_toml().replace("[price.sources.mock]\n", "");
		let result: Result<BridgeConfig, _> = bad.parse();
		assert!(result.is_err());
	}

	#[test]
	fn resolves_env_var_with_default() {
		let input = "value = \"${MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn missing_required_env_var_errors() {
		let input = "value = \"${MISSING_REQUIRED_VAR}\"";
		assert!(resolve_env_vars(input).is_err());
	}
}
