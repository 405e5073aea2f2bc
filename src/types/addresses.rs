//! Lending protocol addresses on the monitored network

use alloy::primitives::{Address, address};

// Aave v3 on Base mainnet
pub const AAVE_V3_POOL_BASE: Address = address!("A238Dd80C259a72e81d7e4664a9801593F98d1c5");
