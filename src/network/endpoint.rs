//! Feed endpoint lifecycle and supervision

use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use crate::{
    config::{
        PROBE_FAILURE_LIMIT, PROBE_INTERVAL_SECS, PROBE_TIMEOUT_SECS,
        RECONNECT_BASE_DELAY_SECS, RECONNECT_MAX_DELAY_SECS,
    },
    errors::{WatchError, WatchResult},
    network::pool::ConnectionPool,
    network::retry::{RetryConfig, retry_with_backoff},
    FeedProvider,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    Connecting,
    Open,
    Closed,
    Errored,
}

/// Transport-level signals consumed by the pool state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Dialing,
    Opened,
    Closed,
    Errored,
}

pub struct EndpointSlot {
    pub label: String,
    pub url: String,
    pub state: EndpointState,
    /// Present only while the slot is `Open`. Kept optional so the state
    /// machine can be driven with synthetic events in tests.
    pub provider: Option<Arc<FeedProvider>>,
}

impl EndpointSlot {
    pub fn new(label: String, url: String) -> Self {
        Self {
            label,
            url,
            state: EndpointState::Closed,
            provider: None,
        }
    }
}

pub fn spawn_endpoint_supervisors(
    pool: &Arc<ConnectionPool>,
    count: usize,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..count)
        .map(|index| tokio::spawn(run_endpoint_supervisor(pool.clone(), index)))
        .collect()
}

/// Dials one endpoint forever: connect, verify, report `Opened`, watch
/// liveness, report `Errored`, back off and redial. Reconnection lives
/// entirely below the pool; the pool only consumes transport events.
pub async fn run_endpoint_supervisor(pool: Arc<ConnectionPool>, index: usize) {
    let (label, url) = pool.endpoint_info(index).await;
    let mut redial_delay = RECONNECT_BASE_DELAY_SECS;

    loop {
        pool.on_transport_event(index, TransportEvent::Dialing, None)
            .await;

        match connect_feed(&label, &url).await {
            Ok(provider) => {
                redial_delay = RECONNECT_BASE_DELAY_SECS;
                let provider = Arc::new(provider);
                pool.on_transport_event(index, TransportEvent::Opened, Some(provider.clone()))
                    .await;

                watch_liveness(&label, provider.as_ref()).await;

                warn!("📉 Feed '{}' stopped responding", label);
                pool.on_transport_event(index, TransportEvent::Errored, None)
                    .await;
            }
            Err(e) => {
                warn!("⚠️ Failed to open feed '{}': {}", label, e);
                pool.on_transport_event(index, TransportEvent::Errored, None)
                    .await;
            }
        }

        debug!("Feed '{}' redialing in {}s", label, redial_delay);
        tokio::time::sleep(Duration::from_secs(redial_delay)).await;
        redial_delay = (redial_delay * 2).min(RECONNECT_MAX_DELAY_SECS);
    }
}

async fn connect_feed(label: &str, url: &str) -> WatchResult<FeedProvider> {
    let ws = WsConnect::new(url);
    let provider = ProviderBuilder::new()
        .on_ws(ws)
        .await
        .map(|p| p.root().clone())
        .map_err(|e| WatchError::Transport {
            endpoint: label.to_string(),
            message: "WebSocket handshake failed".to_string(),
            source: Some(e.into()),
        })?;

    let block = retry_with_backoff(
        || async {
            provider
                .get_block_number()
                .await
                .context("Failed to get block number")
        },
        &RetryConfig::default(),
        label,
    )
    .await?;

    info!("✅ Feed '{}' connected at block {}", label, block);
    Ok(provider)
}

/// Returns once the feed has missed `PROBE_FAILURE_LIMIT` probes in a row.
async fn watch_liveness(label: &str, provider: &FeedProvider) {
    let mut probe = tokio::time::interval(Duration::from_secs(PROBE_INTERVAL_SECS));
    probe.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut consecutive_failures = 0u32;

    loop {
        probe.tick().await;

        match timeout(
            Duration::from_secs(PROBE_TIMEOUT_SECS),
            provider.get_block_number(),
        )
        .await
        {
            Ok(Ok(block)) => {
                consecutive_failures = 0;
                debug!("Feed '{}' alive at block {}", label, block);
            }
            Ok(Err(e)) => {
                consecutive_failures += 1;
                warn!(
                    "⚠️ Probe failed for feed '{}' ({}/{}): {}",
                    label, consecutive_failures, PROBE_FAILURE_LIMIT, e
                );
            }
            Err(_) => {
                consecutive_failures += 1;
                warn!(
                    "⚠️ Probe timed out for feed '{}' ({}/{})",
                    label, consecutive_failures, PROBE_FAILURE_LIMIT
                );
            }
        }

        if consecutive_failures >= PROBE_FAILURE_LIMIT {
            return;
        }
    }
}
