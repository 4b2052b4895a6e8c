//! Tracked wallets: the data model, the in-memory registry and durable storage.

pub mod persistence;
pub mod registry;
pub mod types;

pub use persistence::{FileWalletRepository, WalletRepository};
pub use registry::WalletRegistry;
pub use types::*;
