//! HTTP handlers for the bridge API, one module per concern.

pub mod admin;
pub mod bridge;
pub mod quote;
pub mod status;
pub mod user;

/// Parses a `0x`-prefixed destination address from a request body, mapping a
/// malformed value to the same 400 the rest of the surface uses for bad input.
pub(crate) fn parse_address(raw: &str) -> Result<bridge_types::Address, bridge_types::ApiError> {
	raw.parse()
		.map_err(|_| crate::server::bad_request(format!("invalid destination address: {raw}")))
}

#[cfg(test)]
pub(crate) mod test_support {
	use std::sync::Arc;

	use crate::engine::BridgeEngine;
	use crate::server::AppState;
	use bridge_config::BridgeConfig;

	/// Two price sources are required by `PriceFeedService`, but only `fixed`
	/// never makes a real network call, so handler tests stick to operations
	/// that never reach into the price feed.
	pub(crate) fn sample_config() -> BridgeConfig {
		let raw = r#"
[bridge]
id = "bridge-test"
bootstrap_admin = "root-admin"
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
[storage.implementations.memory]

[signer]
provider = "local"
[signer.config]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff8"

[price.sources.fixed]
[price.sources.coingecko]
"#;
		raw.parse().expect("sample config must be valid")
	}

	pub(crate) async fn sample_state() -> AppState {
		let engine: Arc<BridgeEngine> = BridgeEngine::bootstrap(sample_config())
			.await
			.expect("bootstrap must succeed against the in-memory backend");
		AppState { engine }
	}
}
