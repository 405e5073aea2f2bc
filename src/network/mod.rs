//! Feed connections, pooling and failover

pub mod endpoint;
pub mod pool;
pub mod retry;

pub use endpoint::*;
pub use pool::*;
pub use retry::*;
