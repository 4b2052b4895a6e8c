//! In-memory registry of tracked wallets.
//!
//! The registry is owned by the reconciliation loop, which is its only writer. Wallets are
//! kept in first-reference order so enumeration (and therefore ranking tie-breaks) is
//! deterministic.

use crate::wallet::Wallet;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct WalletRegistry {
	wallets: Vec<Wallet>,
	index: HashMap<String, usize>,
}

impl WalletRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seed the registry from persisted records, replacing any wallet with the same address.
	pub fn load(&mut self, wallets: impl IntoIterator<Item = Wallet>) {
		for wallet in wallets {
			self.put(wallet);
		}
	}

	/// Look up a wallet, creating a zero-valued one on first reference.
	pub fn get_or_create(&mut self, address: &str) -> &mut Wallet {
		let slot = match self.index.get(address) {
			Some(slot) => *slot,
			None => {
				self.wallets.push(Wallet::new(address));
				let slot = self.wallets.len() - 1;
				self.index.insert(address.to_string(), slot);
				slot
			}
		};
		&mut self.wallets[slot]
	}

	pub fn get(&self, address: &str) -> Option<&Wallet> {
		self.index.get(address).map(|slot| &self.wallets[*slot])
	}

	pub fn get_mut(&mut self, address: &str) -> Option<&mut Wallet> {
		self.index
			.get(address)
			.map(|slot| &mut self.wallets[*slot])
	}

	/// Insert or replace a wallet, keeping the original position of a known address.
	pub fn put(&mut self, wallet: Wallet) {
		match self.index.get(&wallet.address) {
			Some(slot) => self.wallets[*slot] = wallet,
			None => {
				self.index
					.insert(wallet.address.clone(), self.wallets.len());
				self.wallets.push(wallet);
			}
		}
	}

	/// Point-in-time copy of every wallet, independent of later mutation.
	pub fn all(&self) -> Vec<Wallet> {
		self.wallets.clone()
	}

	pub fn len(&self) -> usize {
		self.wallets.len()
	}

	/// Minimum `last_checked_height` across all wallets, or 0 when empty.
	pub fn lowest_checked_height(&self) -> u64 {
		self.wallets
			.iter()
			.map(|wallet| wallet.last_checked_height)
			.min()
			.unwrap_or(0)
	}

	/// Addresses whose last reconciliation is more than `spread` blocks behind `height`.
	pub fn stale_addresses(&self, height: u64, spread: u64) -> Vec<String> {
		self.wallets
			.iter()
			.filter(|wallet| height.saturating_sub(wallet.last_checked_height) > spread)
			.map(|wallet| wallet.address.clone())
			.collect()
	}
}
