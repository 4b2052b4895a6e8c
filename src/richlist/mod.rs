//! Richlist reconciliation services.
//!
//! This module keeps the tracked wallets' balances reconciled with the chain and publishes the
//! per-denomination rankings built from them. It includes:
//! - The decimal resolver that turns raw chain amounts into scaled decimals
//! - The balance aggregator that rebuilds a wallet from its chain components
//! - The retry policy for transient node failures
//! - The reconciliation loop that drives passes and persistence
//! - The ranking publisher and its read handle

pub mod aggregator;
pub mod decimals;
pub mod orchestrator;
pub mod progress_tracker;
pub mod ranking;
pub mod retry;
pub mod types;

#[cfg(test)]
mod testing;

pub use aggregator::BalanceAggregator;
pub use decimals::DecimalResolver;
pub use orchestrator::{ReconcileConfig, ReconciliationLoop};
pub use ranking::{RankingPublisher, RichlistReader};
pub use retry::RetryPolicy;
pub use types::RichlistError;
