use crate::chain::ChainError;

/// Error types for reconciliation
#[derive(Debug, thiserror::Error)]
pub enum RichlistError {
	#[error("Chain error: {0}")]
	Chain(#[from] ChainError),

	#[error("Unknown denomination: {0}")]
	UnknownDenomination(String),

	#[error("Invalid amount {value:?} for {denom}")]
	InvalidAmount { denom: String, value: String },

	#[error("Amount for {denom} cannot be represented at {decimals} decimals")]
	AmountOutOfRange { denom: String, decimals: u32 },

	#[error("Persistence error: {0}")]
	Persistence(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl RichlistError {
	/// Remote unavailability that clears up by waiting.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			RichlistError::Chain(ChainError::RequestTimedOut | ChainError::NodeCatchingUp)
		)
	}

	/// The wallet's validator classification no longer matches the chain.
	pub fn is_classification_stale(&self) -> bool {
		matches!(
			self,
			RichlistError::Chain(
				ChainError::DelegationNotFound(_) | ChainError::ValidatorNotFound(_)
			)
		)
	}
}
