use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The seven independently sourced parts of a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceField {
	Available,
	Staking,
	Unbonding,
	Rewards,
	Commission,
	Orders,
	Positions,
}

impl BalanceField {
	pub const ALL: [BalanceField; 7] = [
		BalanceField::Available,
		BalanceField::Staking,
		BalanceField::Unbonding,
		BalanceField::Rewards,
		BalanceField::Commission,
		BalanceField::Orders,
		BalanceField::Positions,
	];
}

/// Balance of one denomination held by one wallet.
///
/// Components are only written through [`BalanceComponents::set`], which rescales the
/// value to the denomination's precision and recomputes `total` from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceComponents {
	available: Decimal,
	staking: Decimal,
	unbonding: Decimal,
	rewards: Decimal,
	commission: Decimal,
	orders: Decimal,
	positions: Decimal,
	total: Decimal,
}

impl BalanceComponents {
	/// All-zero balance rendered at `decimals` fractional digits.
	pub fn zero(decimals: u32) -> Self {
		let mut zero = Decimal::ZERO;
		zero.rescale(decimals);
		Self {
			available: zero,
			staking: zero,
			unbonding: zero,
			rewards: zero,
			commission: zero,
			orders: zero,
			positions: zero,
			total: zero,
		}
	}

	pub fn get(&self, field: BalanceField) -> Decimal {
		match field {
			BalanceField::Available => self.available,
			BalanceField::Staking => self.staking,
			BalanceField::Unbonding => self.unbonding,
			BalanceField::Rewards => self.rewards,
			BalanceField::Commission => self.commission,
			BalanceField::Orders => self.orders,
			BalanceField::Positions => self.positions,
		}
	}

	pub fn total(&self) -> Decimal {
		self.total
	}

	/// Overwrite one component and recompute the total.
	pub fn set(&mut self, field: BalanceField, amount: Decimal, decimals: u32) {
		let slot = match field {
			BalanceField::Available => &mut self.available,
			BalanceField::Staking => &mut self.staking,
			BalanceField::Unbonding => &mut self.unbonding,
			BalanceField::Rewards => &mut self.rewards,
			BalanceField::Commission => &mut self.commission,
			BalanceField::Orders => &mut self.orders,
			BalanceField::Positions => &mut self.positions,
		};
		*slot = round_to_scale(amount, decimals);
		self.recompute_total(decimals);
	}

	fn recompute_total(&mut self, decimals: u32) {
		let sum: Decimal = BalanceField::ALL.iter().map(|field| self.get(*field)).sum();
		self.total = round_to_scale(sum, decimals);
	}
}

/// Round to `decimals` fractional digits and pin the scale so the value renders with
/// exactly that many digits.
pub fn round_to_scale(amount: Decimal, decimals: u32) -> Decimal {
	let mut rounded = amount.round_dp(decimals);
	rounded.rescale(decimals);
	rounded
}

/// A tracked wallet and its reconciled balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
	pub address: String,
	pub username: Option<String>,
	/// Operator address, present while the wallet is classified as a validator.
	#[serde(rename = "validator")]
	pub validator_operator_address: Option<String>,
	#[serde(default)]
	pub last_seen_height: u64,
	#[serde(default)]
	pub last_seen_time: Option<DateTime<Utc>>,
	#[serde(default)]
	pub last_checked_height: u64,
	#[serde(default)]
	pub last_checked_time: Option<DateTime<Utc>>,
	/// Denominations the wallet holds; an absent denomination is a zero balance.
	#[serde(rename = "balance", default)]
	pub balances: BTreeMap<String, BalanceComponents>,
}

impl Wallet {
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			username: None,
			validator_operator_address: None,
			last_seen_height: 0,
			last_seen_time: None,
			last_checked_height: 0,
			last_checked_time: None,
			balances: BTreeMap::new(),
		}
	}

	pub fn is_validator(&self) -> bool {
		self.validator_operator_address.is_some()
	}

	/// Drop the validator classification, turning this into an ordinary wallet.
	pub fn demote(&mut self) {
		self.validator_operator_address = None;
		self.username = None;
	}

	pub fn balance(&self, denom: &str) -> Option<&BalanceComponents> {
		self.balances.get(denom)
	}

	pub fn clear_balances(&mut self) {
		self.balances.clear();
	}

	/// Write one component of `denom`, creating a zero entry on first touch.
	pub fn merge_balance(
		&mut self,
		denom: &str,
		field: BalanceField,
		amount: Decimal,
		decimals: u32,
	) {
		self.balances
			.entry(denom.to_string())
			.or_insert_with(|| BalanceComponents::zero(decimals))
			.set(field, amount, decimals);
	}
}
