//! Main entry point for the gasless cross-chain settlement bridge.
//!
//! Loads configuration, wires every component into a `BridgeEngine`, and runs
//! the HTTP API alongside a background quote-expiry sweep until interrupted.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

mod apis;
mod engine;
mod server;

use engine::BridgeEngine;

/// Command-line arguments for the bridge service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

const EXPIRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("starting bridge service");

	let config = bridge_config::BridgeConfig::from_file(
		args.config
			.to_str()
			.ok_or("config path is not valid UTF-8")?,
	)?;
	tracing::info!(bridge_id = %config.bridge.id, "loaded configuration");

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);
	let api_host = config
		.api
		.as_ref()
		.map(|api| api.host.clone())
		.unwrap_or_else(|| "127.0.0.1".to_string());
	let api_port = config.api.as_ref().map(|api| api.port).unwrap_or(3000);

	let engine = BridgeEngine::bootstrap(config).await?;
	tracing::info!("bridge engine ready");

	let sweep_engine = engine.clone();
	let sweep_task = async move {
		loop {
			tokio::time::sleep(EXPIRY_SWEEP_INTERVAL).await;
			match sweep_engine.quote.sweep_expired().await {
				Ok(count) if count > 0 => tracing::info!(count, "swept expired quotes"),
				Ok(_) => {}
				Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
			}
		}
	};

	if api_enabled {
		let api_engine = engine.clone();
		let api_task = server::start_server(&api_host, api_port, api_engine);

		tracing::info!("starting expiry sweep and API server");
		tokio::select! {
			_ = sweep_task => {
				tracing::info!("expiry sweep loop exited");
			}
			result = api_task => {
				tracing::info!("API server finished");
				result?;
			}
		}
	} else {
		tracing::info!("API disabled, running expiry sweep only");
		sweep_task.await;
	}

	tracing::info!("stopped bridge service");
	Ok(())
}
