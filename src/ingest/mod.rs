//! On-chain event and pending-transaction ingestion

pub mod events;
pub mod feed;
pub mod mempool;
pub mod topics;

pub use events::*;
pub use feed::*;
pub use mempool::*;
pub use topics::*;
