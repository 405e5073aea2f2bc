//! Aave v3 Liquidation Risk Watcher - On-chain account health monitoring for Base network
//!
//! This watcher holds redundant websocket feeds to the chain, follows pool
//! activity and the pending-transaction firehose, schedules debounced health
//! factor checks for the accounts involved, and alerts when an account sits
//! at or below the liquidation threshold.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod ingest;
pub mod solvency;
pub mod scheduler;
pub mod dispatch;
pub mod utils;
pub mod storage;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{WatchError, WatchResult};
pub use types::*;

// Type alias for our concrete pubsub provider
pub type FeedProvider = alloy::providers::RootProvider<alloy::pubsub::PubSubFrontend>;
