//! Balance aggregation for a single wallet.
//!
//! A refresh rebuilds the wallet's balances from scratch out of the node's independently
//! sourced components: spot balances, delegations, unbonding, profile metadata and
//! distribution (validator commission and self-bond rewards, or delegator rewards).
//!
//! The aggregator never retries. Transient failures and stale validator classifications
//! propagate to the reconciliation loop. A denomination missing from the token registry
//! only drops that denomination's component; the rest of the refresh continues.

use crate::chain::{ChainSource, Coin};
use crate::richlist::{DecimalResolver, RichlistError};
use crate::wallet::{BalanceField, Wallet};

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

pub struct BalanceAggregator {
	source: Arc<dyn ChainSource>,
	decimals: Arc<DecimalResolver>,
	/// Denomination assumed for unbonding entries that do not carry one.
	unbonding_denom: String,
}

impl BalanceAggregator {
	pub fn new(
		source: Arc<dyn ChainSource>,
		decimals: Arc<DecimalResolver>,
		unbonding_denom: String,
	) -> Self {
		Self {
			source,
			decimals,
			unbonding_denom,
		}
	}

	/// Rebuild `wallet`'s balances and profile fields from live chain state.
	///
	/// On error the wallet may hold a partially rebuilt balance map; callers refresh a
	/// copy and only keep it on success.
	pub async fn refresh(&self, wallet: &mut Wallet) -> Result<(), RichlistError> {
		debug!("Refreshing wallet {}", wallet.address);

		wallet.clear_balances();
		self.merge_spot_balance(wallet).await?;
		self.merge_delegations(wallet).await?;
		self.merge_unbonding(wallet).await?;
		self.merge_profile(wallet).await?;

		match wallet.validator_operator_address.clone() {
			Some(operator) => self.merge_validator_distribution(wallet, &operator).await?,
			None => self.merge_delegator_distribution(wallet).await?,
		}

		Ok(())
	}

	async fn merge_spot_balance(&self, wallet: &mut Wallet) -> Result<(), RichlistError> {
		let balances = self.source.spot_balance(&wallet.address).await?;
		for balance in balances {
			let merged = async {
				let decimals = self.decimals.decimals_of(&balance.denom).await?;
				let parts = [
					(BalanceField::Available, &balance.available),
					(BalanceField::Orders, &balance.order),
					(BalanceField::Positions, &balance.position),
				];
				for (field, value) in parts {
					let amount = self.decimals.human_amount(&balance.denom, value).await?;
					wallet.merge_balance(&balance.denom, field, amount, decimals);
				}
				Ok::<(), RichlistError>(())
			}
			.await;
			skip_bad_denom(merged, &wallet.address, &balance.denom)?;
		}
		Ok(())
	}

	async fn merge_delegations(&self, wallet: &mut Wallet) -> Result<(), RichlistError> {
		let delegations = self.source.delegator_delegations(&wallet.address).await?;

		let mut per_denom: BTreeMap<String, Vec<String>> = BTreeMap::new();
		for delegation in delegations {
			per_denom
				.entry(delegation.balance.denom)
				.or_default()
				.push(delegation.balance.amount);
		}

		for (denom, amounts) in per_denom {
			let merged = self.merge_raw_sum(wallet, &denom, &amounts, BalanceField::Staking).await;
			skip_bad_denom(merged, &wallet.address, &denom)?;
		}
		Ok(())
	}

	async fn merge_unbonding(&self, wallet: &mut Wallet) -> Result<(), RichlistError> {
		let unbonding = self
			.source
			.delegator_unbonding_delegations(&wallet.address)
			.await?;

		let mut per_denom: BTreeMap<String, Vec<String>> = BTreeMap::new();
		for entry in unbonding.into_iter().flat_map(|u| u.entries) {
			let denom = entry
				.denom
				.unwrap_or_else(|| self.unbonding_denom.clone());
			per_denom.entry(denom).or_default().push(entry.balance);
		}

		for (denom, amounts) in per_denom {
			let merged = self.merge_raw_sum(wallet, &denom, &amounts, BalanceField::Unbonding).await;
			skip_bad_denom(merged, &wallet.address, &denom)?;
		}
		Ok(())
	}

	async fn merge_profile(&self, wallet: &mut Wallet) -> Result<(), RichlistError> {
		let profile = self.source.profile(&wallet.address).await?;

		if let Some(username) = profile.username.filter(|name| !name.is_empty()) {
			wallet.username = Some(username);
		}
		wallet.last_seen_height = profile.last_seen_block;
		wallet.last_seen_time = profile.last_seen_time;
		Ok(())
	}

	async fn merge_validator_distribution(
		&self,
		wallet: &mut Wallet,
		operator: &str,
	) -> Result<(), RichlistError> {
		let distribution = self.source.validator_distribution(operator).await?;
		self.merge_coins(wallet, &distribution.self_bond_rewards, BalanceField::Rewards)
			.await?;
		self.merge_coins(wallet, &distribution.val_commission, BalanceField::Commission)
			.await
	}

	async fn merge_delegator_distribution(&self, wallet: &mut Wallet) -> Result<(), RichlistError> {
		let rewards = self.source.delegator_distribution(&wallet.address).await?;
		self.merge_coins(wallet, &rewards.total, BalanceField::Rewards)
			.await
	}

	async fn merge_coins(
		&self,
		wallet: &mut Wallet,
		coins: &[Coin],
		field: BalanceField,
	) -> Result<(), RichlistError> {
		for coin in coins {
			let merged = async {
				let decimals = self.decimals.decimals_of(&coin.denom).await?;
				let amount = self.decimals.amount_to_decimal(&coin.denom, &coin.amount).await?;
				wallet.merge_balance(&coin.denom, field, amount, decimals);
				Ok::<(), RichlistError>(())
			}
			.await;
			skip_bad_denom(merged, &wallet.address, &coin.denom)?;
		}
		Ok(())
	}

	/// Convert each raw amount, sum them and write the sum as `field` of `denom`.
	async fn merge_raw_sum(
		&self,
		wallet: &mut Wallet,
		denom: &str,
		amounts: &[String],
		field: BalanceField,
	) -> Result<(), RichlistError> {
		let decimals = self.decimals.decimals_of(denom).await?;
		let mut total = Decimal::ZERO;
		for raw in amounts {
			total += self.decimals.amount_to_decimal(denom, raw).await?;
		}
		wallet.merge_balance(denom, field, total, decimals);
		Ok(())
	}
}

/// Contain a data-integrity failure (missing token metadata, an amount that cannot be
/// parsed or represented) to the denomination it concerns.
fn skip_bad_denom(
	result: Result<(), RichlistError>,
	address: &str,
	denom: &str,
) -> Result<(), RichlistError> {
	match result {
		Err(
			err @ (RichlistError::UnknownDenomination(_)
			| RichlistError::InvalidAmount { .. }
			| RichlistError::AmountOutOfRange { .. }),
		) => {
			error!("Skipping '{}' balance of {}: {}", denom, address, err);
			Ok(())
		}
		other => other,
	}
}
