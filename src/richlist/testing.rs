//! Scripted in-memory chain and repository for reconciliation tests.

use crate::chain::*;
use crate::richlist::RichlistError;
use crate::wallet::{Wallet, WalletRepository};

use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct ChainState {
	blocks: Vec<BlockInfo>,
	validators: Vec<ValidatorInfo>,
	validator_delegations: HashMap<String, Vec<ValidatorDelegation>>,
	delegations: HashMap<String, Vec<Delegation>>,
	unbonding: HashMap<String, Vec<UnbondingDelegation>>,
	delegator_rewards: HashMap<String, DelegatorRewards>,
	validator_distribution: HashMap<String, ValidatorDistribution>,
	spot: HashMap<String, Vec<SpotBalance>>,
	profiles: HashMap<String, Profile>,
	tokens: Vec<TokenInfo>,
	failures: HashMap<String, VecDeque<ChainError>>,
	calls: HashMap<String, u32>,
}

#[derive(Default)]
pub struct MockChain {
	state: Mutex<ChainState>,
}

pub fn block_time(seconds: i64) -> DateTime<Utc> {
	Utc.timestamp_opt(1_620_000_000 + seconds, 0).unwrap()
}

fn coin(denom: &str, amount: &str) -> Coin {
	Coin {
		denom: denom.to_string(),
		amount: amount.to_string(),
	}
}

fn coins(entries: &[(&str, &str)]) -> Vec<Coin> {
	entries.iter().map(|(d, a)| coin(d, a)).collect()
}

impl MockChain {
	pub fn new() -> Self {
		Self::default()
	}

	fn edit(&self, f: impl FnOnce(&mut ChainState)) {
		f(&mut self.state.lock().unwrap());
	}

	pub fn with_token(self, denom: &str, decimals: u32) -> Self {
		self.edit(|s| {
			s.tokens.push(TokenInfo {
				denom: denom.to_string(),
				decimals,
			})
		});
		self
	}

	pub fn set_tokens(&self, tokens: &[(&str, u32)]) {
		self.edit(|s| {
			s.tokens = tokens
				.iter()
				.map(|(denom, decimals)| TokenInfo {
					denom: denom.to_string(),
					decimals: *decimals,
				})
				.collect()
		});
	}

	pub fn set_block(&self, height: u64) {
		self.edit(|s| {
			s.blocks = vec![BlockInfo {
				height,
				time: block_time(height as i64),
			}]
		});
	}

	pub fn with_block(self, height: u64) -> Self {
		self.set_block(height);
		self
	}

	pub fn with_validator(
		self,
		operator: &str,
		wallet: &str,
		moniker: &str,
		delegators: &[(&str, &str)],
	) -> Self {
		self.edit(|s| {
			s.validators.push(ValidatorInfo {
				operator_address: operator.to_string(),
				wallet_address: wallet.to_string(),
				moniker: moniker.to_string(),
			});
			s.validator_delegations.insert(
				operator.to_string(),
				delegators
					.iter()
					.map(|(delegator, amount)| ValidatorDelegation {
						delegator_address: delegator.to_string(),
						balance: coin("swth", amount),
					})
					.collect(),
			);
		});
		self
	}

	pub fn with_delegations(self, address: &str, entries: &[(&str, &str)]) -> Self {
		self.edit(|s| {
			s.delegations.insert(
				address.to_string(),
				entries
					.iter()
					.map(|(denom, amount)| Delegation {
						balance: coin(denom, amount),
					})
					.collect(),
			);
		});
		self
	}

	pub fn with_unbonding(self, address: &str, entries: &[(&str, Option<&str>)]) -> Self {
		self.edit(|s| {
			s.unbonding.insert(
				address.to_string(),
				vec![UnbondingDelegation {
					entries: entries
						.iter()
						.map(|(balance, denom)| UnbondingEntry {
							balance: balance.to_string(),
							denom: denom.map(str::to_string),
						})
						.collect(),
				}],
			);
		});
		self
	}

	pub fn with_delegator_rewards(self, address: &str, total: &[(&str, &str)]) -> Self {
		self.edit(|s| {
			s.delegator_rewards.insert(
				address.to_string(),
				DelegatorRewards {
					total: coins(total),
				},
			);
		});
		self
	}

	pub fn with_validator_distribution(
		self,
		operator: &str,
		self_bond_rewards: &[(&str, &str)],
		val_commission: &[(&str, &str)],
	) -> Self {
		self.edit(|s| {
			s.validator_distribution.insert(
				operator.to_string(),
				ValidatorDistribution {
					self_bond_rewards: coins(self_bond_rewards),
					val_commission: coins(val_commission),
				},
			);
		});
		self
	}

	pub fn with_spot(
		self,
		address: &str,
		denom: &str,
		available: &str,
		order: &str,
		position: &str,
	) -> Self {
		self.edit(|s| {
			s.spot
				.entry(address.to_string())
				.or_default()
				.push(SpotBalance {
					denom: denom.to_string(),
					available: available.to_string(),
					order: order.to_string(),
					position: position.to_string(),
				});
		});
		self
	}

	pub fn with_profile(self, address: &str, username: &str, last_seen_block: u64) -> Self {
		self.edit(|s| {
			s.profiles.insert(
				address.to_string(),
				Profile {
					username: Some(username.to_string()),
					last_seen_block,
					last_seen_time: Some(block_time(last_seen_block as i64)),
				},
			);
		});
		self
	}

	/// Queue an error for the next call of `endpoint` with `key`.
	pub fn fail_next(&self, endpoint: &str, key: &str, error: ChainError) {
		self.edit(|s| {
			s.failures
				.entry(format!("{endpoint}:{key}"))
				.or_default()
				.push_back(error)
		});
	}

	pub fn calls(&self, endpoint: &str, key: &str) -> u32 {
		let state = self.state.lock().unwrap();
		state
			.calls
			.get(&format!("{endpoint}:{key}"))
			.copied()
			.unwrap_or(0)
	}

	pub fn token_fetches(&self) -> u32 {
		self.calls("all_tokens", "")
	}

	/// Record the call and pop a scripted failure, if any.
	fn enter(&self, endpoint: &str, key: &str) -> Result<std::sync::MutexGuard<'_, ChainState>, ChainError> {
		let mut state = self.state.lock().unwrap();
		let id = format!("{endpoint}:{key}");
		*state.calls.entry(id.clone()).or_default() += 1;
		if let Some(error) = state.failures.get_mut(&id).and_then(VecDeque::pop_front) {
			return Err(error);
		}
		Ok(state)
	}
}

#[async_trait::async_trait]
impl ChainSource for MockChain {
	async fn latest_blocks(&self, limit: u32) -> Result<Vec<BlockInfo>, ChainError> {
		let state = self.enter("latest_blocks", "")?;
		Ok(state.blocks.iter().take(limit as usize).cloned().collect())
	}

	async fn all_validators(&self) -> Result<Vec<ValidatorInfo>, ChainError> {
		Ok(self.enter("all_validators", "")?.validators.clone())
	}

	async fn validator_delegations(
		&self,
		operator_address: &str,
	) -> Result<Vec<ValidatorDelegation>, ChainError> {
		let state = self.enter("validator_delegations", operator_address)?;
		Ok(state
			.validator_delegations
			.get(operator_address)
			.cloned()
			.unwrap_or_default())
	}

	async fn delegator_delegations(&self, address: &str) -> Result<Vec<Delegation>, ChainError> {
		let state = self.enter("delegator_delegations", address)?;
		Ok(state.delegations.get(address).cloned().unwrap_or_default())
	}

	async fn delegator_unbonding_delegations(
		&self,
		address: &str,
	) -> Result<Vec<UnbondingDelegation>, ChainError> {
		let state = self.enter("delegator_unbonding_delegations", address)?;
		Ok(state.unbonding.get(address).cloned().unwrap_or_default())
	}

	async fn delegator_distribution(
		&self,
		address: &str,
	) -> Result<DelegatorRewards, ChainError> {
		let state = self.enter("delegator_distribution", address)?;
		Ok(state
			.delegator_rewards
			.get(address)
			.cloned()
			.unwrap_or_default())
	}

	async fn validator_distribution(
		&self,
		operator_address: &str,
	) -> Result<ValidatorDistribution, ChainError> {
		let state = self.enter("validator_distribution", operator_address)?;
		Ok(state
			.validator_distribution
			.get(operator_address)
			.cloned()
			.unwrap_or_default())
	}

	async fn spot_balance(&self, address: &str) -> Result<Vec<SpotBalance>, ChainError> {
		let state = self.enter("spot_balance", address)?;
		Ok(state.spot.get(address).cloned().unwrap_or_default())
	}

	async fn profile(&self, address: &str) -> Result<Profile, ChainError> {
		let state = self.enter("profile", address)?;
		Ok(state.profiles.get(address).cloned().unwrap_or_default())
	}

	async fn all_tokens(&self) -> Result<Vec<TokenInfo>, ChainError> {
		Ok(self.enter("all_tokens", "")?.tokens.clone())
	}
}

/// Repository that keeps every saved record in memory.
#[derive(Default)]
pub struct MemoryWalletRepository {
	saved: Mutex<Vec<Wallet>>,
	seed: Vec<Wallet>,
}

impl MemoryWalletRepository {
	pub fn with_wallets(wallets: Vec<Wallet>) -> Self {
		Self {
			saved: Mutex::new(Vec::new()),
			seed: wallets,
		}
	}

	pub fn saved(&self) -> Vec<Wallet> {
		self.saved.lock().unwrap().clone()
	}
}

#[async_trait::async_trait]
impl WalletRepository for MemoryWalletRepository {
	async fn save(&self, wallet: &Wallet) -> Result<(), RichlistError> {
		self.saved.lock().unwrap().push(wallet.clone());
		Ok(())
	}

	async fn load_all(&self) -> Result<Vec<Wallet>, RichlistError> {
		Ok(self.seed.clone())
	}
}

#[async_trait::async_trait]
impl<T: WalletRepository + Send + Sync> WalletRepository for std::sync::Arc<T> {
	async fn save(&self, wallet: &Wallet) -> Result<(), RichlistError> {
		(**self).save(wallet).await
	}

	async fn load_all(&self) -> Result<Vec<Wallet>, RichlistError> {
		(**self).load_all().await
	}
}
