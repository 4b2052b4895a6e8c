//! Chain data source integration
//!
//! This module provides the `ChainSource` abstraction over the Carbon REST node and its
//! reqwest implementation. The node serves block headers, validators, staking and
//! distribution state, spot balances, account profiles and token metadata.

/// REST client for the Carbon node
mod client;
/// Data source trait consumed by the reconciler
mod source;
/// Response types and the chain error taxonomy
mod types;

pub use client::CarbonRestClient;
pub use source::ChainSource;
pub use types::*;
