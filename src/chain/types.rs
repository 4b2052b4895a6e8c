//! Types for the Carbon REST node responses consumed by the reconciler

use crate::utils::de::{null_as_default, number_from_any, optional_timestamp};

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A block header as returned by `/get_blocks`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockInfo {
	/// The block height.
	#[serde(rename = "block_height", deserialize_with = "number_from_any")]
	pub height: u64,
	/// The block timestamp.
	pub time: DateTime<Utc>,
}

/// A validator as returned by `/get_all_validators`.
///
/// The node nests the moniker inside the validator description; this type flattens it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawValidator")]
pub struct ValidatorInfo {
	/// The validator operator address (`swthvaloper...`).
	pub operator_address: String,
	/// The wallet address owning the validator.
	pub wallet_address: String,
	/// The validator's display name.
	pub moniker: String,
}

#[derive(Deserialize)]
struct RawValidator {
	#[serde(rename = "OperatorAddress")]
	operator_address: String,
	#[serde(rename = "WalletAddress")]
	wallet_address: String,
	#[serde(rename = "Description", default)]
	description: RawDescription,
}

#[derive(Deserialize, Default)]
struct RawDescription {
	#[serde(default)]
	moniker: String,
}

impl From<RawValidator> for ValidatorInfo {
	fn from(raw: RawValidator) -> Self {
		Self {
			operator_address: raw.operator_address,
			wallet_address: raw.wallet_address,
			moniker: raw.description.moniker,
		}
	}
}

/// An amount of a single denomination.
///
/// `amount` is kept as the node's string encoding: raw chain units for staking and
/// distribution endpoints, possibly with a fractional part for reward accumulators.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Coin {
	pub denom: String,
	pub amount: String,
}

/// A delegation to a validator, seen from the validator's side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidatorDelegation {
	pub delegator_address: String,
	pub balance: Coin,
}

/// A delegation made by a delegator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Delegation {
	pub balance: Coin,
}

/// An in-flight unbonding from one validator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnbondingDelegation {
	#[serde(default, deserialize_with = "null_as_default")]
	pub entries: Vec<UnbondingEntry>,
}

/// A single unbonding entry.
///
/// The node reports the raw amount only; `denom` is populated if a future node version
/// starts carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnbondingEntry {
	pub balance: String,
	#[serde(default)]
	pub denom: Option<String>,
}

/// Outstanding rewards of a delegator across all validators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DelegatorRewards {
	#[serde(default, deserialize_with = "null_as_default")]
	pub total: Vec<Coin>,
}

/// Distribution state of a validator operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidatorDistribution {
	#[serde(default, deserialize_with = "null_as_default")]
	pub self_bond_rewards: Vec<Coin>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub val_commission: Vec<Coin>,
}

/// Spot balance of one denomination, already expressed in human units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpotBalance {
	pub denom: String,
	pub available: String,
	pub order: String,
	pub position: String,
}

/// Account profile as returned by `/get_profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Profile {
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default, deserialize_with = "number_from_any")]
	pub last_seen_block: u64,
	#[serde(default, deserialize_with = "optional_timestamp")]
	pub last_seen_time: Option<DateTime<Utc>>,
}

/// Token metadata as returned by `/get_tokens`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
	pub denom: String,
	#[serde(deserialize_with = "number_from_any")]
	pub decimals: u32,
}

/// Legacy Cosmos LCD envelope: `{"height": "...", "result": ...}`.
#[derive(Debug, Deserialize)]
pub struct LcdResponse<T> {
	pub result: Option<T>,
}

impl<T: Default> LcdResponse<T> {
	/// Take the result, treating a missing or null result as empty.
	pub fn into_result(self) -> T {
		self.result.unwrap_or_default()
	}
}

/// Error types for REST node queries
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
	#[error("Request timed out")]
	RequestTimedOut,

	#[error("Node is catching up")]
	NodeCatchingUp,

	#[error("Delegation not found: {0}")]
	DelegationNotFound(String),

	#[error("Validator not found: {0}")]
	ValidatorNotFound(String),

	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("API error {status}: {message}")]
	ApiError { status: u16, message: String },

	#[error("No data returned: {0}")]
	NoData(String),
}
