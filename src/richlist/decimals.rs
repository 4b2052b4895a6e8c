//! Denomination precision lookup and raw-unit conversion.
//!
//! Scales are filled from a single bulk token fetch on first use. A scale never changes
//! once cached. A lookup miss after the cache is filled may trigger one more bulk fetch,
//! at most once per `refresh_interval`, which only adds denominations the cache lacks.

use crate::chain::ChainSource;
use crate::richlist::RichlistError;

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info};

/// Largest scale a `Decimal` can carry.
const MAX_SCALE: u32 = 28;

#[derive(Default)]
struct TokenCache {
	scales: HashMap<String, u32>,
	filled_at: Option<Instant>,
}

pub struct DecimalResolver {
	source: Arc<dyn ChainSource>,
	cache: RwLock<TokenCache>,
	refresh_interval: Duration,
}

impl DecimalResolver {
	pub fn new(source: Arc<dyn ChainSource>, refresh_interval: Duration) -> Self {
		Self {
			source,
			cache: RwLock::new(TokenCache::default()),
			refresh_interval,
		}
	}

	/// Number of fractional digits of `denom`.
	///
	/// # Errors
	/// `UnknownDenomination` if the token registry does not list `denom`; chain errors
	/// from the bulk fetch are propagated as-is.
	pub async fn decimals_of(&self, denom: &str) -> Result<u32, RichlistError> {
		if let Some(decimals) = self.cache.read().await.scales.get(denom) {
			return Ok(*decimals);
		}

		let mut cache = self.cache.write().await;
		// Another caller may have filled it while we waited for the lock
		if let Some(decimals) = cache.scales.get(denom) {
			return Ok(*decimals);
		}

		let may_fill = cache
			.filled_at
			.is_none_or(|filled_at| filled_at.elapsed() >= self.refresh_interval);
		if may_fill {
			let tokens = self.source.all_tokens().await?;
			let before = cache.scales.len();
			for token in tokens {
				cache.scales.entry(token.denom).or_insert(token.decimals);
			}
			cache.filled_at = Some(Instant::now());
			info!(
				"Token cache filled: {} denominations ({} new)",
				cache.scales.len(),
				cache.scales.len() - before
			);
		}

		match cache.scales.get(denom) {
			Some(decimals) => Ok(*decimals),
			None => {
				error!("No token metadata for denomination '{}'", denom);
				Err(RichlistError::UnknownDenomination(denom.to_string()))
			}
		}
	}

	/// Convert a raw chain amount (smallest unit) into a decimal of `denom`.
	pub async fn amount_to_decimal(&self, denom: &str, raw: &str) -> Result<Decimal, RichlistError> {
		let decimals = self.decimals_of(denom).await?;
		let raw = parse_amount(denom, raw)?;
		shift_by_decimals(denom, raw, decimals)
	}

	/// Parse an amount already in human units, at `denom`'s precision.
	pub async fn human_amount(&self, denom: &str, value: &str) -> Result<Decimal, RichlistError> {
		let decimals = self.decimals_of(denom).await?;
		let amount = parse_amount(denom, value)?;
		Ok(amount.round_dp(decimals))
	}
}

fn parse_amount(denom: &str, value: &str) -> Result<Decimal, RichlistError> {
	Decimal::from_str(value.trim()).map_err(|_| RichlistError::InvalidAmount {
		denom: denom.to_string(),
		value: value.to_string(),
	})
}

/// `raw / 10^decimals`, computed exactly by moving the decimal point.
fn shift_by_decimals(denom: &str, raw: Decimal, decimals: u32) -> Result<Decimal, RichlistError> {
	if decimals > MAX_SCALE {
		return Err(RichlistError::AmountOutOfRange {
			denom: denom.to_string(),
			decimals,
		});
	}
	// Fractional digits beyond what fits after the shift are below the denom's precision
	let mut shifted = if raw.scale() + decimals > MAX_SCALE {
		raw.round_dp(MAX_SCALE - decimals)
	} else {
		raw
	};
	shifted
		.set_scale(shifted.scale() + decimals)
		.map_err(|_| RichlistError::AmountOutOfRange {
			denom: denom.to_string(),
			decimals,
		})?;
	Ok(shifted)
}
