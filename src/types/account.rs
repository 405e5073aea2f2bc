//! Account registry types

use rust_decimal::Decimal;
use tokio::time::Instant;

/// Sentinel stored when the health metric is unknown or does not fit a
/// `Decimal` (debt-free accounts report `uint256::MAX`). Always above any
/// real threshold, so it can never trip an alert.
pub const METRIC_UNKNOWN: Decimal = Decimal::MAX;

#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub last_checked: Option<Instant>,
    pub last_metric: Decimal,
    pub in_flight: bool,
}

impl AccountRecord {
    pub fn new() -> Self {
        Self {
            last_checked: None,
            last_metric: METRIC_UNKNOWN,
            in_flight: false,
        }
    }
}

impl Default for AccountRecord {
    fn default() -> Self {
        Self::new()
    }
}
