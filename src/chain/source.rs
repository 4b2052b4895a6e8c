use super::types::*;

/// Remote data source the reconciler reads chain state from.
///
/// Every call is a single request; retries are the caller's concern.
#[async_trait::async_trait]
pub trait ChainSource: Send + Sync {
	/// The most recent `limit` blocks, newest first.
	async fn latest_blocks(&self, limit: u32) -> Result<Vec<BlockInfo>, ChainError>;

	async fn all_validators(&self) -> Result<Vec<ValidatorInfo>, ChainError>;

	async fn validator_delegations(
		&self,
		operator_address: &str,
	) -> Result<Vec<ValidatorDelegation>, ChainError>;

	async fn delegator_delegations(&self, address: &str) -> Result<Vec<Delegation>, ChainError>;

	async fn delegator_unbonding_delegations(
		&self,
		address: &str,
	) -> Result<Vec<UnbondingDelegation>, ChainError>;

	async fn delegator_distribution(&self, address: &str)
	-> Result<DelegatorRewards, ChainError>;

	async fn validator_distribution(
		&self,
		operator_address: &str,
	) -> Result<ValidatorDistribution, ChainError>;

	/// Spot balances per denomination, in human units.
	async fn spot_balance(&self, address: &str) -> Result<Vec<SpotBalance>, ChainError>;

	async fn profile(&self, address: &str) -> Result<Profile, ChainError>;

	/// Metadata for every token known to the chain.
	async fn all_tokens(&self) -> Result<Vec<TokenInfo>, ChainError>;
}
