//!
//! Shared helpers.
//!
//! Serde adapters used to decode the REST node's loosely typed responses.
pub mod de;
