//! Service configuration from environment variables.

use crate::richlist::{ReconcileConfig, RetryPolicy, RichlistError};

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

#[derive(Clone, Debug)]
pub struct RichlistConfig {
	/// Base URL of the Carbon REST node
	pub rest_url: String,
	/// Pause between reconciliation passes
	pub poll_interval: Duration,
	/// Blocks a wallet may fall behind before it is refreshed
	pub wallet_refresh_spread: u64,
	/// Blocks between full validator discovery scans
	pub validator_refresh_spread: u64,
	pub timeout_backoff: Duration,
	pub catching_up_backoff: Duration,
	/// Cap on attempts per transient failure; unbounded when unset
	pub max_transient_retries: Option<u32>,
	/// Denomination for unbonding entries that do not name one
	pub unbonding_denom: String,
	/// Minimum age of the token cache before a miss may refill it
	pub token_refresh_interval: Duration,
	/// Directory holding one JSON record per wallet
	pub database_path: PathBuf,
	pub http_timeout: Duration,
}

impl RichlistConfig {
	/// Load configuration from environment variables
	///
	/// Environment variables:
	/// - `CARBON_REST_URL`: REST node (default `https://tradescan.switcheo.org`)
	/// - `SECONDS_BETWEEN_BLOCK_FETCH`: pause between passes (default 10)
	/// - `MAX_BLOCK_SPREAD_UPDATE_WALLET`: wallet refresh spread (default 2000)
	/// - `MAX_BLOCK_SPREAD_FETCH_SOURCES`: validator refresh spread (default 5000)
	/// - `REQUEST_TIMEOUT_SECS` / `CATCHING_UP_BACKOFF_SECS`: retry delays (30 / 60)
	/// - `MAX_TRANSIENT_RETRIES`: optional attempt cap
	/// - `UNBONDING_DENOM`: fallback unbonding denomination (default `swth`)
	/// - `TOKEN_REFRESH_SECS`: token cache refill interval (default 600)
	/// - `DATABASE_PATH`: wallet record directory (default `database/richlist/wallet`)
	/// - `HTTP_TIMEOUT_SECS`: per-request HTTP timeout (default 30)
	pub fn from_env() -> Result<Self, RichlistError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RichlistError> {
		let config = Self {
			rest_url: lookup("CARBON_REST_URL")
				.unwrap_or_else(|| "https://tradescan.switcheo.org".to_string()),
			poll_interval: seconds(parse_or(&lookup, "SECONDS_BETWEEN_BLOCK_FETCH", 10.0)?)?,
			wallet_refresh_spread: parse_or(&lookup, "MAX_BLOCK_SPREAD_UPDATE_WALLET", 2000)?,
			validator_refresh_spread: parse_or(&lookup, "MAX_BLOCK_SPREAD_FETCH_SOURCES", 5000)?,
			timeout_backoff: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?),
			catching_up_backoff: Duration::from_secs(parse_or(
				&lookup,
				"CATCHING_UP_BACKOFF_SECS",
				60,
			)?),
			max_transient_retries: parse_optional(&lookup, "MAX_TRANSIENT_RETRIES")?,
			unbonding_denom: lookup("UNBONDING_DENOM").unwrap_or_else(|| "swth".to_string()),
			token_refresh_interval: Duration::from_secs(parse_or(
				&lookup,
				"TOKEN_REFRESH_SECS",
				600,
			)?),
			database_path: lookup("DATABASE_PATH")
				.map(PathBuf::from)
				.unwrap_or_else(|| PathBuf::from("database/richlist/wallet")),
			http_timeout: Duration::from_secs(parse_or(&lookup, "HTTP_TIMEOUT_SECS", 30)?),
		};

		info!("REST node: {}", config.rest_url);
		info!("Wallet records: {}", config.database_path.display());
		Ok(config)
	}

	pub fn retry_policy(&self) -> RetryPolicy {
		RetryPolicy {
			timeout_backoff: self.timeout_backoff,
			catching_up_backoff: self.catching_up_backoff,
			max_attempts: self.max_transient_retries,
		}
	}

	pub fn reconcile_config(&self) -> ReconcileConfig {
		ReconcileConfig {
			wallet_refresh_spread: self.wallet_refresh_spread,
			validator_refresh_spread: self.validator_refresh_spread,
			poll_interval: self.poll_interval,
		}
	}
}

fn parse_optional<T: FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	key: &str,
) -> Result<Option<T>, RichlistError> {
	match lookup(key).map(|raw| raw.trim().to_string()) {
		None => Ok(None),
		Some(raw) if raw.is_empty() => Ok(None),
		Some(raw) => raw
			.parse()
			.map(Some)
			.map_err(|_| RichlistError::Config(format!("{key} has an invalid value {raw:?}"))),
	}
}

fn parse_or<T: FromStr>(
	lookup: &impl Fn(&str) -> Option<String>,
	key: &str,
	default: T,
) -> Result<T, RichlistError> {
	Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn seconds(value: f64) -> Result<Duration, RichlistError> {
	Duration::try_from_secs_f64(value)
		.map_err(|_| RichlistError::Config(format!("{value} is not a valid number of seconds")))
}
