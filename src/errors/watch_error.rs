//! Custom error types for the watcher

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Transport error on {endpoint}: {message}")]
    Transport {
        endpoint: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("No feed connection is currently active")]
    NoActiveFeed,

    #[error("Malformed payload: {context}")]
    Decode {
        context: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Health query failed for {account}: {message}")]
    Query {
        account: Address,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Alert delivery failed: {message}")]
    Delivery {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

pub type WatchResult<T> = Result<T, WatchError>;
