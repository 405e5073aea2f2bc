//! Account health queries against the lending pool

use alloy::{
    primitives::{Address, U256, keccak256},
    providers::Provider,
    pubsub::PubSubFrontend,
    rpc::types::eth::TransactionRequest,
    sol_types::SolValue,
};
use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use crate::{
    config::HEALTH_FACTOR_DECIMALS,
    errors::{WatchError, WatchResult},
    network::pool::ConnectionPool,
    types::METRIC_UNKNOWN,
    utils::{format_metric, pow10},
};

/// Anything that can resolve an account to its current health factor.
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn query(&self, account: Address) -> WatchResult<Decimal>;
}

pub struct ChainHealthSource {
    pool: Arc<ConnectionPool>,
    contract: Address,
    query_timeout: Duration,
}

impl ChainHealthSource {
    pub fn new(pool: Arc<ConnectionPool>, contract: Address, query_timeout: Duration) -> Self {
        Self {
            pool,
            contract,
            query_timeout,
        }
    }
}

#[async_trait]
impl HealthSource for ChainHealthSource {
    async fn query(&self, account: Address) -> WatchResult<Decimal> {
        let feed = self.pool.active().await.ok_or(WatchError::NoActiveFeed)?;

        let raw = timeout(
            self.query_timeout,
            get_user_account_data(feed.provider.as_ref(), self.contract, account),
        )
        .await
        .map_err(|_| WatchError::Query {
            account,
            message: format!("timed out after {}s", self.query_timeout.as_secs()),
            source: None,
        })?
        .map_err(|e| WatchError::Query {
            account,
            message: "getUserAccountData call failed".to_string(),
            source: Some(e),
        })?;

        let metric = scale_health_factor(raw);
        debug!(
            "Health factor for {} via '{}': {}",
            account,
            feed.label,
            format_metric(metric)
        );
        Ok(metric)
    }
}

pub fn account_data_calldata(account: Address) -> Vec<u8> {
    let mut data = keccak256("getUserAccountData(address)")[..4].to_vec();
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(account.as_slice());
    data
}

/// Raw `healthFactor` word from `getUserAccountData(address)` (sixth
/// return value, 1e18 scale).
pub async fn get_user_account_data(
    provider: &dyn Provider<PubSubFrontend>,
    contract: Address,
    account: Address,
) -> anyhow::Result<U256> {
    let tx = TransactionRequest::default()
        .to(contract)
        .input(account_data_calldata(account).into());

    let result = provider
        .call(&tx)
        .await
        .context("Failed to call getUserAccountData")?;
    let decoded = <(U256, U256, U256, U256, U256, U256)>::abi_decode(&result, true)
        .context("Failed to decode account data")?;
    Ok(decoded.5)
}

/// Scales the 1e18 health factor into a `Decimal`. Values that do not fit
/// (debt-free accounts report `uint256::MAX`) map to `METRIC_UNKNOWN`.
pub fn scale_health_factor(raw: U256) -> Decimal {
    match Decimal::from_str(&raw.to_string()) {
        Ok(value) => value / pow10(HEALTH_FACTOR_DECIMALS),
        Err(_) => METRIC_UNKNOWN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn calldata_uses_known_selector_and_padded_address() {
        let account = Address::with_last_byte(0x42);
        let data = account_data_calldata(account);
        assert_eq!(&data[..4], &[0xbf, 0x92, 0x85, 0x7c]);
        assert_eq!(data.len(), 36);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(&data[16..36], account.as_slice());
    }

    #[test]
    fn scales_healthy_factor() {
        let raw = U256::from(1_050_000_000_000_000_000u64);
        assert_eq!(scale_health_factor(raw), dec!(1.05));
    }

    #[test]
    fn scales_at_risk_factor() {
        let raw = U256::from(980_000_000_000_000_000u64);
        assert_eq!(scale_health_factor(raw), dec!(0.98));
    }

    #[test]
    fn zero_factor_stays_zero() {
        assert_eq!(scale_health_factor(U256::ZERO), dec!(0));
    }

    #[test]
    fn debt_free_sentinel_maps_to_unknown() {
        assert_eq!(scale_health_factor(U256::MAX), METRIC_UNKNOWN);
    }
}
