//! Pending transaction screening for live liquidation attempts

use alloy::consensus::Transaction as _;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::Transaction;
use alloy::sol_types::SolValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{CONFIG, RESUBSCRIBE_DELAY_SECS};
use crate::ingest::feed::{FeedChange, next_feed_change};
use crate::ingest::topics::LIQUIDATION_CALL_SELECTOR;
use crate::network::ConnectionPool;
use crate::scheduler::HealthScheduler;
use crate::types::ProtocolNotification;

/// A pending transaction is interesting only when it calls the pool's
/// `liquidationCall`. The borrower sits at argument index 2.
pub fn classify_pending_transaction(
    to: Option<Address>,
    input: &Bytes,
    pool_address: Address,
) -> Option<ProtocolNotification> {
    if to != Some(pool_address) {
        return None;
    }
    if input.len() < 4 || input[..4] != *LIQUIDATION_CALL_SELECTOR {
        return None;
    }

    match <(Address, Address, Address, U256, bool)>::abi_decode(&input[4..], true) {
        Ok((_, _, account, _, _)) => {
            Some(ProtocolNotification::PendingLiquidationAttempt { account })
        }
        Err(e) => {
            debug!("liquidationCall with undecodable calldata, skipping: {}", e);
            None
        }
    }
}

/// Pending-transaction firehose task. Like the log ingester it follows
/// the active feed and re-subscribes on every promotion.
pub async fn run_pending_ingestion(pool: Arc<ConnectionPool>, scheduler: HealthScheduler) {
    let mut generation_rx = pool.watch_generation();

    loop {
        let Some(feed) = pool.active().await else {
            if generation_rx.changed().await.is_err() {
                return;
            }
            continue;
        };

        let mut sub = match feed.provider.subscribe_full_pending_transactions().await {
            Ok(sub) => sub,
            Err(e) => {
                warn!(
                    "⚠️ Pending tx subscription on '{}' failed: {}",
                    feed.label, e
                );
                sleep(Duration::from_secs(RESUBSCRIBE_DELAY_SECS)).await;
                continue;
            }
        };
        info!("📡 Subscribed to pending transactions on feed '{}'", feed.label);

        loop {
            tokio::select! {
                result = sub.recv() => match result {
                    Ok(tx) => handle_pending(&tx, &scheduler).await,
                    Err(e) => {
                        warn!("⚠️ Pending tx stream on '{}' ended: {}", feed.label, e);
                        break;
                    }
                },
                change = next_feed_change(&mut generation_rx, feed.generation) => match change {
                    FeedChange::Resubscribe => {
                        info!("🔁 Active feed changed, resubscribing pending transactions");
                        break;
                    }
                    FeedChange::Shutdown => return,
                }
            }
        }
    }
}

async fn handle_pending(tx: &Transaction, scheduler: &HealthScheduler) {
    let Some(ProtocolNotification::PendingLiquidationAttempt { account }) =
        classify_pending_transaction(tx.to(), tx.input(), CONFIG.pool_address)
    else {
        return;
    };

    warn!(
        "⚡ Pending liquidation attempt against {} (tx {})",
        account, tx.inner.tx_hash()
    );
    scheduler.notify(account).await;
}
