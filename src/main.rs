mod chain;
mod config;
mod richlist;
mod utils;
mod wallet;

use std::sync::Arc;
use tracing::{error, info};

use crate::chain::{CarbonRestClient, ChainSource};
use crate::config::RichlistConfig;
use crate::richlist::{
	BalanceAggregator, DecimalResolver, RankingPublisher, ReconciliationLoop,
};
use crate::wallet::FileWalletRepository;

#[tokio::main(flavor = "current_thread")]
async fn main() {
	// Pick up a local .env file if present
	dotenv::dotenv().ok();

	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting richlist service");

	let config = match RichlistConfig::from_env() {
		Ok(config) => config,
		Err(e) => {
			error!("Invalid configuration: {}", e);
			return;
		}
	};

	let source: Arc<dyn ChainSource> = Arc::new(CarbonRestClient::new(
		config.rest_url.clone(),
		config.http_timeout,
	));

	info!("Created REST client");

	let repository = match FileWalletRepository::create(config.database_path.clone()).await {
		Ok(repository) => repository,
		Err(e) => {
			error!("Failed to open wallet records: {}", e);
			return;
		}
	};

	let decimals = Arc::new(DecimalResolver::new(
		source.clone(),
		config.token_refresh_interval,
	));
	let aggregator = BalanceAggregator::new(
		source.clone(),
		decimals,
		config.unbonding_denom.clone(),
	);
	let (publisher, reader) = RankingPublisher::new();

	let mut reconciler = ReconciliationLoop::new(
		source,
		aggregator,
		Box::new(repository),
		publisher,
		config.retry_policy(),
		config.reconcile_config(),
	);

	if let Err(e) = reconciler.bootstrap().await {
		error!("Failed to load wallet records: {}", e);
		return;
	}

	tokio::select! {
		_ = reconciler.run() => {}
		signal = tokio::signal::ctrl_c() => match signal {
			Ok(()) => info!("Shutdown requested"),
			Err(e) => error!("Failed to listen for shutdown signal: {}", e),
		}
	}

	let richlist = reader.snapshot();
	info!(
		"Stopping with {} tracked wallets and {} published richlists",
		reconciler.registry().len(),
		richlist.len()
	);
	for denom in reader.denominations() {
		let ranking = reader.ranking_for(&denom);
		if let Some(top) = ranking.first() {
			info!(
				"Richlist '{}': {} wallets, top holder {} with {}",
				denom,
				ranking.len(),
				top.address,
				top.balance.total()
			);
		}
	}
}
