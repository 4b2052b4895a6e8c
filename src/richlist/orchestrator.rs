//! Reconciliation loop and integration point for all richlist services.
//!
//! This module defines the `ReconciliationLoop`, which keeps every tracked wallet's balances in
//! step with the chain. Each pass walks the same fixed sequence:
//!
//! - Polling: fetch the latest block height and time
//! - ValidatorRefresh: when the last full validator scan is too far behind, rediscover every
//!   validator and its delegators (discovery only, no balance fetches)
//! - SelectStale: pick the wallets whose last refresh is too far behind the current height
//! - UpdateWallets: refresh, persist and store each stale wallet, one at a time
//! - PublishRanking: rebuild and publish the per-denomination richlists
//!
//! The loop is the only writer of the `WalletRegistry`. Transient node failures are retried in
//! place by the `RetryPolicy`; a stale validator classification demotes the wallet and retries it
//! once as an ordinary wallet. A wallet whose refresh fails is left untouched for the next pass.

use crate::chain::{BlockInfo, ChainError, ChainSource};
use crate::richlist::{
    BalanceAggregator, RankingPublisher, RetryPolicy, RichlistError,
    progress_tracker::{PassProgressTracker, PassStats},
};
use crate::wallet::{Wallet, WalletRegistry, WalletRepository};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Scheduling configuration of the reconciliation loop
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Blocks a wallet may fall behind before it is refreshed
    pub wallet_refresh_spread: u64,
    /// Blocks between full validator discovery scans
    pub validator_refresh_spread: u64,
    /// Pause between passes
    pub poll_interval: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            wallet_refresh_spread: 2000,
            validator_refresh_spread: 5000,
            poll_interval: Duration::from_secs(10),
        }
    }
}

pub struct ReconciliationLoop {
    source: Arc<dyn ChainSource>,
    aggregator: BalanceAggregator,
    registry: WalletRegistry,
    repository: Box<dyn WalletRepository + Send + Sync>,
    publisher: RankingPublisher,
    retry: RetryPolicy,
    config: ReconcileConfig,
    last_full_validator_check: u64,
}

impl ReconciliationLoop {
    pub fn new(
        source: Arc<dyn ChainSource>,
        aggregator: BalanceAggregator,
        repository: Box<dyn WalletRepository + Send + Sync>,
        publisher: RankingPublisher,
        retry: RetryPolicy,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            source,
            aggregator,
            registry: WalletRegistry::new(),
            repository,
            publisher,
            retry,
            config,
            last_full_validator_check: 0,
        }
    }

    /// Seed the registry from persisted records.
    ///
    /// The validator scan cursor starts at the lowest checked height, so an empty or badly
    /// outdated database triggers discovery on the first pass.
    pub async fn bootstrap(&mut self) -> Result<(), RichlistError> {
        let wallets = self.repository.load_all().await?;
        self.registry.load(wallets);
        self.last_full_validator_check = self.registry.lowest_checked_height();
        info!(
            "Loaded {} wallets, lowest checked height {}",
            self.registry.len(),
            self.last_full_validator_check
        );
        Ok(())
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    /// Run passes until the task is cancelled.
    pub async fn run(&mut self) {
        loop {
            match self.run_pass().await {
                Ok(stats) => {
                    info!("{}", stats.summary());
                    tokio::time::sleep(self.config.poll_interval).await;
                }
                Err(err) => match self.retry.delay_for(&err) {
                    Some(delay) => {
                        warn!(
                            "Reconciliation pass interrupted: {}, waiting {}s",
                            err,
                            delay.as_secs_f64()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!("Reconciliation pass failed: {}", err);
                        tokio::time::sleep(self.config.poll_interval).await;
                    }
                },
            }
        }
    }

    /// Run one full pass against the latest block.
    pub async fn run_pass(&mut self) -> Result<PassStats, RichlistError> {
        let block = self.latest_block().await?;
        debug!("Latest block {} at {}", block.height, block.time);
        let mut tracker = PassProgressTracker::new(block.height);

        if block.height.saturating_sub(self.last_full_validator_check)
            > self.config.validator_refresh_spread
        {
            self.refresh_validators().await?;
            self.last_full_validator_check = block.height;
            tracker.record_validator_refresh();
        }

        let stale = self
            .registry
            .stale_addresses(block.height, self.config.wallet_refresh_spread);
        tracker.record_selected(stale.len());

        for address in stale {
            match self.update_wallet(&address, &block).await {
                Ok(demoted) => {
                    if demoted {
                        tracker.record_demoted();
                    }
                    tracker.record_updated();
                }
                Err(err) => {
                    error!("Failed to update wallet {}: {}", address, err);
                    tracker.record_skipped();
                }
            }
        }

        self.publisher.publish(&self.registry.all());
        Ok(tracker.get_stats())
    }

    async fn latest_block(&self) -> Result<BlockInfo, RichlistError> {
        let blocks = self.source.latest_blocks(1).await?;
        blocks
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::NoData("latest block".to_string()).into())
    }

    /// Touch every validator's own wallet and every delegator as tracked wallets.
    async fn refresh_validators(&mut self) -> Result<(), RichlistError> {
        let source = &self.source;
        let validators = self
            .retry
            .run("validators", move || async move {
                Ok::<_, RichlistError>(source.all_validators().await?)
            })
            .await?;
        info!("Refreshing {} validators", validators.len());

        for validator in validators {
            let wallet = self.registry.get_or_create(&validator.wallet_address);
            wallet.validator_operator_address = Some(validator.operator_address.clone());
            wallet.username = Some(validator.moniker.clone());

            let source = &self.source;
            let operator = validator.operator_address.as_str();
            let delegations = self
                .retry
                .run(operator, move || async move {
                    Ok::<_, RichlistError>(source.validator_delegations(operator).await?)
                })
                .await;

            match delegations {
                Ok(delegations) => {
                    debug!(
                        "Validator {} has {} delegators",
                        validator.moniker,
                        delegations.len()
                    );
                    for delegation in delegations {
                        self.registry.get_or_create(&delegation.delegator_address);
                    }
                }
                Err(err) if err.is_transient() => return Err(err),
                Err(err) => {
                    error!(
                        "Skipping delegators of validator {}: {}",
                        validator.operator_address, err
                    );
                }
            }
        }
        Ok(())
    }

    /// Refresh, persist and store one wallet. Returns whether the wallet was demoted.
    async fn update_wallet(
        &mut self,
        address: &str,
        block: &BlockInfo,
    ) -> Result<bool, RichlistError> {
        let Some(mut snapshot) = self.registry.get(address).cloned() else {
            return Err(RichlistError::Persistence(format!(
                "wallet {address} is not tracked"
            )));
        };

        let mut demoted = false;
        let mut refreshed = match self.refresh_with_retry(&snapshot).await {
            Ok(wallet) => wallet,
            Err(err) if err.is_classification_stale() => {
                info!(
                    "Wallet {} is no longer a validator ({}), retrying as an ordinary wallet",
                    address, err
                );
                demoted = snapshot.is_validator();
                snapshot.demote();
                if let Some(wallet) = self.registry.get_mut(address) {
                    wallet.demote();
                }
                self.refresh_with_retry(&snapshot).await?
            }
            Err(err) => return Err(err),
        };

        refreshed.last_checked_height = block.height;
        refreshed.last_checked_time = Some(block.time);
        self.repository.save(&refreshed).await?;
        self.registry.put(refreshed);
        Ok(demoted)
    }

    /// Refresh a fresh copy of `wallet` per attempt; the original is never touched.
    async fn refresh_with_retry(&self, wallet: &Wallet) -> Result<Wallet, RichlistError> {
        let aggregator = &self.aggregator;
        self.retry
            .run(&wallet.address, move || {
                let mut candidate = wallet.clone();
                async move {
                    aggregator.refresh(&mut candidate).await?;
                    Ok::<_, RichlistError>(candidate)
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richlist::DecimalResolver;
    use crate::richlist::testing::{MemoryWalletRepository, MockChain};
    use crate::wallet::BalanceField;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn checked_at(address: &str, height: u64) -> Wallet {
        let mut wallet = Wallet::new(address);
        wallet.last_checked_height = height;
        wallet
    }

    fn fast_retry(max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            timeout_backoff: Duration::from_millis(1),
            catching_up_backoff: Duration::from_millis(1),
            max_attempts,
        }
    }

    struct Harness {
        chain: Arc<MockChain>,
        repository: Arc<MemoryWalletRepository>,
        reconciler: ReconciliationLoop,
        reader: crate::richlist::RichlistReader,
    }

    async fn harness(
        chain: MockChain,
        seed: Vec<Wallet>,
        max_attempts: Option<u32>,
    ) -> Harness {
        let chain = Arc::new(chain);
        let repository = Arc::new(MemoryWalletRepository::with_wallets(seed));
        let decimals = Arc::new(DecimalResolver::new(chain.clone(), Duration::from_secs(600)));
        let aggregator = BalanceAggregator::new(chain.clone(), decimals, "swth".to_string());
        let (publisher, reader) = RankingPublisher::new();
        let mut reconciler = ReconciliationLoop::new(
            chain.clone(),
            aggregator,
            Box::new(repository.clone()),
            publisher,
            fast_retry(max_attempts),
            ReconcileConfig::default(),
        );
        reconciler.bootstrap().await.unwrap();
        Harness {
            chain,
            repository,
            reconciler,
            reader,
        }
    }

    #[tokio::test]
    async fn test_first_pass_discovers_validators_and_delegators() {
        let chain = MockChain::new()
            .with_token("swth", 8)
            .with_block(10_000)
            .with_validator(
                "swthvaloper1v",
                "swth1v",
                "Devel",
                &[("swth1d1", "100"), ("swth1d2", "200")],
            )
            .with_spot("swth1d1", "swth", "3", "0", "0");
        let mut h = harness(chain, Vec::new(), None).await;

        let stats = h.reconciler.run_pass().await.unwrap();
        assert!(stats.validators_refreshed);
        assert_eq!(stats.selected, 3);
        assert_eq!(stats.updated, 3);

        let validator = h.reconciler.registry().get("swth1v").unwrap();
        assert_eq!(validator.validator_operator_address.as_deref(), Some("swthvaloper1v"));
        assert_eq!(validator.username.as_deref(), Some("Devel"));
        assert_eq!(validator.last_checked_height, 10_000);
        assert!(h.reconciler.registry().get("swth1d2").is_some());
        assert_eq!(h.repository.saved().len(), 3);

        // The validator distribution is used for the operator, not delegator rewards
        assert_eq!(h.chain.calls("validator_distribution", "swthvaloper1v"), 1);
        assert_eq!(h.chain.calls("delegator_distribution", "swth1v"), 0);
    }

    #[tokio::test]
    async fn test_only_stale_wallets_are_refreshed() {
        let chain = MockChain::new().with_token("swth", 8).with_block(10_000);
        let seed = vec![checked_at("fresh", 9_500), checked_at("stale", 7_000)];
        let mut h = harness(chain, seed, None).await;

        let stats = h.reconciler.run_pass().await.unwrap();
        // Lowest checked height 7000 is within the validator spread of 10000
        assert!(!stats.validators_refreshed);
        assert_eq!(stats.selected, 1);
        assert_eq!(h.chain.calls("spot_balance", "stale"), 1);
        assert_eq!(h.chain.calls("spot_balance", "fresh"), 0);

        // A second pass at the same height finds nothing to do
        let stats = h.reconciler.run_pass().await.unwrap();
        assert_eq!(stats.selected, 0);
    }

    #[tokio::test]
    async fn test_transient_failure_leaves_wallet_unchanged() {
        let chain = MockChain::new()
            .with_token("swth", 8)
            .with_block(10_000)
            .with_spot("swth1a", "swth", "5", "0", "0");
        let mut seeded = checked_at("swth1a", 7_000);
        seeded.merge_balance("swth", BalanceField::Available, dec("1"), 8);
        let mut h = harness(chain, vec![seeded], Some(1)).await;
        h.chain
            .fail_next("delegator_delegations", "swth1a", ChainError::RequestTimedOut);

        let stats = h.reconciler.run_pass().await.unwrap();
        assert_eq!(stats.skipped, 1);

        let wallet = h.reconciler.registry().get("swth1a").unwrap();
        assert_eq!(wallet.last_checked_height, 7_000);
        assert_eq!(wallet.balance("swth").unwrap().total(), dec("1"));
        assert!(h.repository.saved().is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_in_place() {
        let chain = MockChain::new()
            .with_token("swth", 8)
            .with_block(10_000)
            .with_spot("swth1a", "swth", "5", "0", "0");
        let mut h = harness(chain, vec![checked_at("swth1a", 7_000)], None).await;
        h.chain
            .fail_next("profile", "swth1a", ChainError::NodeCatchingUp);

        let stats = h.reconciler.run_pass().await.unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(h.chain.calls("spot_balance", "swth1a"), 2);

        let saved = h.repository.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].last_checked_height, 10_000);
        assert_eq!(saved[0].balance("swth").unwrap().total(), dec("5"));
    }

    #[tokio::test]
    async fn test_stale_validator_is_demoted_and_refreshed() {
        let chain = MockChain::new()
            .with_token("swth", 8)
            .with_block(10_000)
            .with_delegator_rewards("swth1v", &[("swth", "100000000")]);
        let mut validator = checked_at("swth1v", 7_000);
        validator.validator_operator_address = Some("swthvaloper1v".to_string());
        validator.username = Some("Devel".to_string());
        let mut h = harness(chain, vec![validator], None).await;
        h.chain.fail_next(
            "validator_distribution",
            "swthvaloper1v",
            ChainError::DelegationNotFound("no delegation".into()),
        );

        let stats = h.reconciler.run_pass().await.unwrap();
        assert_eq!(stats.demoted, 1);
        assert_eq!(stats.updated, 1);

        let wallet = h.reconciler.registry().get("swth1v").unwrap();
        assert_eq!(wallet.validator_operator_address, None);
        assert_eq!(wallet.username, None);
        assert_eq!(
            wallet.balance("swth").unwrap().get(BalanceField::Rewards),
            dec("1")
        );
        assert_eq!(wallet.last_checked_height, 10_000);
    }

    #[tokio::test]
    async fn test_recurring_stale_error_skips_wallet() {
        let chain = MockChain::new().with_token("swth", 8).with_block(10_000);
        let mut validator = checked_at("swth1v", 7_000);
        validator.validator_operator_address = Some("swthvaloper1v".to_string());
        let mut h = harness(chain, vec![validator], None).await;
        h.chain.fail_next(
            "validator_distribution",
            "swthvaloper1v",
            ChainError::ValidatorNotFound("gone".into()),
        );
        h.chain.fail_next(
            "delegator_distribution",
            "swth1v",
            ChainError::DelegationNotFound("no delegation".into()),
        );

        let stats = h.reconciler.run_pass().await.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.updated, 0);
        assert!(h.repository.saved().is_empty());

        let wallet = h.reconciler.registry().get("swth1v").unwrap();
        assert_eq!(wallet.validator_operator_address, None);
        assert_eq!(wallet.last_checked_height, 7_000);
    }

    #[tokio::test]
    async fn test_block_fetch_failure_does_not_advance_cursors() {
        let chain = MockChain::new().with_token("swth", 8).with_block(10_000);
        let mut h = harness(chain, Vec::new(), None).await;
        h.chain
            .fail_next("latest_blocks", "", ChainError::RequestTimedOut);

        let err = h.reconciler.run_pass().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(h.chain.calls("all_validators", ""), 0);

        // Discovery still happens once the node answers
        let stats = h.reconciler.run_pass().await.unwrap();
        assert!(stats.validators_refreshed);
    }

    #[tokio::test]
    async fn test_pass_publishes_ranking() {
        let chain = MockChain::new()
            .with_token("swth", 8)
            .with_block(10_000)
            .with_spot("swth1a", "swth", "1", "0", "0")
            .with_spot("swth1b", "swth", "2", "0", "0");
        let seed = vec![checked_at("swth1a", 0), checked_at("swth1b", 0)];
        let mut h = harness(chain, seed, None).await;

        h.reconciler.run_pass().await.unwrap();
        let ranking = h.reader.ranking_for("swth");
        let order: Vec<_> = ranking.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(order, vec!["swth1b", "swth1a"]);
        assert_eq!(ranking[0].last_checked_height, 10_000);
    }
}
