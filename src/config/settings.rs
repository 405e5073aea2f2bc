//! Watcher configuration settings and environment variable handling

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use crate::types::AAVE_V3_POOL_BASE;

// Configuration constants
pub const MIN_HEALTH_THRESHOLD: Decimal = dec!(0.5);
pub const MAX_HEALTH_THRESHOLD: Decimal = dec!(2.0);
pub const MAX_CONCURRENT_CHECKS_LIMIT: usize = 64;
pub const HEALTH_FACTOR_DECIMALS: u32 = 18;

// Feed supervision constants
pub const PROBE_INTERVAL_SECS: u64 = 15;
pub const PROBE_TIMEOUT_SECS: u64 = 5;
pub const PROBE_FAILURE_LIMIT: u32 = 3;
pub const RECONNECT_BASE_DELAY_SECS: u64 = 1;
pub const RECONNECT_MAX_DELAY_SECS: u64 = 60;
pub const RESUBSCRIBE_DELAY_SECS: u64 = 2;

/// What `notify` does with an address once the concurrency cap is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    Drop,
    Queue,
}

impl OverflowPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Some(OverflowPolicy::Drop),
            "queue" => Some(OverflowPolicy::Queue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Feed configuration
    pub feed_endpoints: Vec<(String, String)>,
    pub pool_address: Address,
    // Health check configuration
    pub health_threshold: Decimal,
    pub debounce_secs: u64,
    pub max_concurrent_checks: usize,
    pub full_sweep_interval_secs: u64,
    pub query_timeout_secs: u64,
    pub overflow_policy: OverflowPolicy,
    pub overflow_queue_size: usize,
    pub max_tracked_accounts: usize,
    pub watch_accounts: Vec<Address>,
    // Alert configuration
    pub min_alert_spacing_secs: u64,
    pub delivery_timeout_secs: u64,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub dry_run: bool,
    // Alchemy API Key
    pub alchemy_api_key: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        let alchemy_api_key = env::var("ALCHEMY_API_KEY").ok();
        Self {
            feed_endpoints: load_feed_endpoints(alchemy_api_key.as_deref()),
            pool_address: env::var("POOL_ADDRESS")
                .ok()
                .and_then(|s| Address::from_str(&s).ok())
                .unwrap_or(AAVE_V3_POOL_BASE),
            health_threshold: env::var("HEALTH_THRESHOLD")
                .ok()
                .and_then(|s| Decimal::from_str(&s).ok())
                .unwrap_or(dec!(1.05))
                .max(MIN_HEALTH_THRESHOLD)
                .min(MAX_HEALTH_THRESHOLD),
            debounce_secs: env::var("DEBOUNCE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            max_concurrent_checks: env::var("MAX_CONCURRENT_CHECKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4)
                .max(1)
                .min(MAX_CONCURRENT_CHECKS_LIMIT),
            full_sweep_interval_secs: env::var("FULL_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(900)
                .max(1),
            query_timeout_secs: env::var("QUERY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10)
                .max(1),
            overflow_policy: env::var("OVERFLOW_POLICY")
                .ok()
                .and_then(|s| OverflowPolicy::parse(&s))
                .unwrap_or(OverflowPolicy::Drop),
            overflow_queue_size: env::var("OVERFLOW_QUEUE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64)
                .max(1),
            max_tracked_accounts: env::var("MAX_TRACKED_ACCOUNTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0), // 0 = unbounded
            watch_accounts: env::var("WATCH_ACCOUNTS")
                .map(|s| parse_account_list(&s))
                .unwrap_or_default(),
            min_alert_spacing_secs: env::var("MIN_ALERT_SPACING_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1)
                .max(1),
            delivery_timeout_secs: env::var("DELIVERY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10)
                .max(1),
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            dry_run: env::var("DRY_RUN")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            alchemy_api_key,
        }
    }
}

fn load_feed_endpoints(alchemy_api_key: Option<&str>) -> Vec<(String, String)> {
    let mut endpoints = Vec::new();
    match env::var("PRIMARY_WS_URL") {
        Ok(url) => endpoints.push(("primary".to_string(), url)),
        Err(_) => {
            if let Some(key) = alchemy_api_key {
                endpoints.push((
                    "primary".to_string(),
                    format!("wss://base-mainnet.g.alchemy.com/v2/{}", key),
                ));
            }
        }
    }
    if let Ok(url) = env::var("SECONDARY_WS_URL") {
        endpoints.push(("secondary".to_string(), url));
    }
    endpoints
}

pub fn parse_account_list(raw: &str) -> Vec<Address> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| Address::from_str(s).ok())
        .collect()
}
