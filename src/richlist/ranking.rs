//! Per-denomination ranking of wallets by total holdings.
//!
//! The `RankingPublisher` builds a complete richlist from a point-in-time copy of the
//! registry and publishes it through a `tokio::sync::watch` channel, replacing the previous
//! snapshot in one step. Readers hold a cheap `RichlistReader` and always observe either
//! the old or the new snapshot in full, never a mix.

use crate::wallet::{BalanceComponents, Wallet};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// A wallet's holdings of one denomination, as listed in a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedWallet {
    pub address: String,
    pub username: Option<String>,
    pub validator: Option<String>,
    pub last_seen_height: u64,
    pub last_checked_height: u64,
    pub balance: BalanceComponents,
}

/// Rankings keyed by denomination, each sorted by total descending.
pub type Richlist = HashMap<String, Arc<[RankedWallet]>>;

pub struct RankingPublisher {
    sender: watch::Sender<Arc<Richlist>>,
}

/// Read handle on the latest published richlist.
#[derive(Clone)]
pub struct RichlistReader {
    receiver: watch::Receiver<Arc<Richlist>>,
}

impl RankingPublisher {
    /// Create a publisher with an empty richlist and a reader attached to it.
    pub fn new() -> (Self, RichlistReader) {
        let (sender, receiver) = watch::channel(Arc::new(Richlist::new()));
        (Self { sender }, RichlistReader { receiver })
    }

    /// Rebuild every ranking from `wallets` and publish the result.
    ///
    /// `wallets` must be an independent copy of the registry; its order decides ties.
    pub fn publish(&self, wallets: &[Wallet]) {
        let richlist = build_richlist(wallets);
        for (denom, ranking) in &richlist {
            info!(
                "Updated richlist for coin '{}'. Wallets: {}",
                denom,
                ranking.len()
            );
        }
        self.sender.send_replace(Arc::new(richlist));
    }
}

impl RichlistReader {
    /// The latest ranking of `denom`; empty if no tracked wallet holds it.
    pub fn ranking_for(&self, denom: &str) -> Arc<[RankedWallet]> {
        self.receiver
            .borrow()
            .get(denom)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// The whole latest richlist.
    pub fn snapshot(&self) -> Arc<Richlist> {
        self.receiver.borrow().clone()
    }

    pub fn denominations(&self) -> Vec<String> {
        let mut denoms: Vec<String> = self.receiver.borrow().keys().cloned().collect();
        denoms.sort();
        denoms
    }
}

/// Group wallets under every denomination they hold and sort each group.
///
/// `sort_by` is stable, so wallets with equal totals keep their relative input order.
pub fn build_richlist(wallets: &[Wallet]) -> Richlist {
    let mut groups: HashMap<String, Vec<RankedWallet>> = HashMap::new();

    for wallet in wallets {
        for (denom, balance) in &wallet.balances {
            groups.entry(denom.clone()).or_default().push(RankedWallet {
                address: wallet.address.clone(),
                username: wallet.username.clone(),
                validator: wallet.validator_operator_address.clone(),
                last_seen_height: wallet.last_seen_height,
                last_checked_height: wallet.last_checked_height,
                balance: balance.clone(),
            });
        }
    }

    groups
        .into_iter()
        .map(|(denom, mut ranking)| {
            ranking.sort_by(|a, b| b.balance.total().cmp(&a.balance.total()));
            (denom, Arc::from(ranking))
        })
        .collect()
}
