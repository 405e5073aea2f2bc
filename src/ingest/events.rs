//! Confirmed pool event ingestion and decoding

use alloy::primitives::{Address, B256, Log, U256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::{Filter, Log as RpcLog};
use alloy::sol_types::SolValue;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{CONFIG, RESUBSCRIBE_DELAY_SECS};
use crate::dispatch::AlertDispatcher;
use crate::errors::{WatchError, WatchResult};
use crate::ingest::feed::{FeedChange, next_feed_change};
use crate::ingest::topics::*;
use crate::network::ConnectionPool;
use crate::scheduler::HealthScheduler;
use crate::storage::save_liquidation;
use crate::types::{ActivityKind, LiquidationDetails, ProtocolNotification, WatchStats};
use crate::utils::print_liquidation_event;

/// Maps a raw pool log onto a normalized notification. `Ok(None)` means
/// the log is not one we watch; `Err` means it claimed to be one but its
/// payload does not decode.
pub fn decode_protocol_event(
    log: &Log,
    tx_hash: Option<B256>,
) -> WatchResult<Option<ProtocolNotification>> {
    let topics = log.data.topics();
    let Some(topic0) = topics.first() else {
        return Ok(None);
    };

    let kind = if *topic0 == *SUPPLY_TOPIC {
        Some(ActivityKind::Supply)
    } else if *topic0 == *WITHDRAW_TOPIC {
        Some(ActivityKind::Withdraw)
    } else if *topic0 == *BORROW_TOPIC {
        Some(ActivityKind::Borrow)
    } else if *topic0 == *REPAY_TOPIC {
        Some(ActivityKind::Repay)
    } else {
        None
    };

    if let Some(kind) = kind {
        // All four activity events index the affected account second.
        let account = indexed_address(topics, 2, "account")?;
        return Ok(Some(ProtocolNotification::RoutineActivity { account, kind }));
    }

    if *topic0 == *LIQUIDATION_CALL_TOPIC {
        return decode_liquidation_call(log, tx_hash).map(Some);
    }

    Ok(None)
}

fn indexed_address(topics: &[B256], index: usize, what: &str) -> WatchResult<Address> {
    let word = topics.get(index).ok_or_else(|| WatchError::Decode {
        context: format!("missing indexed {} at topic {}", what, index),
        source: None,
    })?;
    Ok(Address::from_word(*word))
}

fn decode_liquidation_call(log: &Log, tx_hash: Option<B256>) -> WatchResult<ProtocolNotification> {
    let topics = log.data.topics();
    let collateral_asset = indexed_address(topics, 1, "collateral asset")?;
    let debt_asset = indexed_address(topics, 2, "debt asset")?;
    let account = indexed_address(topics, 3, "liquidated account")?;

    let (debt_to_cover, liquidated_collateral, liquidator, receive_atoken) =
        <(U256, U256, Address, bool)>::abi_decode(&log.data.data, true).map_err(|e| {
            WatchError::Decode {
                context: "LiquidationCall event data".to_string(),
                source: Some(e.into()),
            }
        })?;

    Ok(ProtocolNotification::ConfirmedLiquidation(LiquidationDetails {
        account,
        collateral_asset,
        debt_asset,
        debt_to_cover,
        liquidated_collateral,
        liquidator,
        receive_atoken,
        tx_hash,
    }))
}

/// Alert text for a liquidation that already executed on chain.
pub fn render_liquidation_alert(details: &LiquidationDetails) -> String {
    let mut message = format!(
        "💥 <b>Liquidation executed</b>\nAccount: <code>{}</code>\nCollateral asset: {}\nDebt asset: {}\nDebt covered: {}\nLiquidator: <code>{}</code>",
        details.account,
        details.collateral_asset,
        details.debt_asset,
        details.debt_to_cover,
        details.liquidator
    );
    if let Some(hash) = details.tx_hash {
        message.push_str(&format!("\nTx: {}", hash));
    }
    message
}

/// Confirmed-log subscription task. Follows the active feed: whenever
/// the pool promotes a different connection the subscription is torn
/// down and re-established on the new one.
pub async fn run_event_ingestion(
    pool: Arc<ConnectionPool>,
    scheduler: HealthScheduler,
    alerts: AlertDispatcher,
    stats: Arc<WatchStats>,
) {
    let mut generation_rx = pool.watch_generation();
    let filter = Filter::new()
        .address(CONFIG.pool_address)
        .event_signature(TRACKED_EVENT_TOPICS.clone());

    loop {
        let Some(feed) = pool.active().await else {
            // Null route; wait for the next promotion.
            if generation_rx.changed().await.is_err() {
                return;
            }
            continue;
        };

        let mut sub = match feed.provider.subscribe_logs(&filter).await {
            Ok(sub) => sub,
            Err(e) => {
                warn!("⚠️ Pool log subscription on '{}' failed: {}", feed.label, e);
                sleep(Duration::from_secs(RESUBSCRIBE_DELAY_SECS)).await;
                continue;
            }
        };
        info!("📡 Subscribed to pool events on feed '{}'", feed.label);

        loop {
            tokio::select! {
                result = sub.recv() => match result {
                    Ok(log) => handle_log(&log, &scheduler, &alerts, &stats).await,
                    Err(e) => {
                        warn!("⚠️ Pool log stream on '{}' ended: {}", feed.label, e);
                        break;
                    }
                },
                change = next_feed_change(&mut generation_rx, feed.generation) => match change {
                    FeedChange::Resubscribe => {
                        info!("🔁 Active feed changed, resubscribing pool events");
                        break;
                    }
                    FeedChange::Shutdown => return,
                }
            }
        }
    }
}

async fn handle_log(
    log: &RpcLog,
    scheduler: &HealthScheduler,
    alerts: &AlertDispatcher,
    stats: &Arc<WatchStats>,
) {
    match decode_protocol_event(&log.inner, log.transaction_hash) {
        Ok(Some(ProtocolNotification::RoutineActivity { account, kind })) => {
            debug!("{:?} activity from {}", kind, account);
            scheduler.notify(account).await;
        }
        Ok(Some(ProtocolNotification::ConfirmedLiquidation(details))) => {
            stats.liquidations_seen.fetch_add(1, Ordering::Relaxed);
            print_liquidation_event(&details);
            if let Err(e) = save_liquidation(&details.to_record()) {
                warn!("⚠️ Failed to save liquidation record: {}", e);
            }
            alerts.enqueue(render_liquidation_alert(&details));
        }
        Ok(Some(ProtocolNotification::PendingLiquidationAttempt { .. })) | Ok(None) => {}
        Err(e) => {
            stats.decode_failures.fetch_add(1, Ordering::Relaxed);
            warn!("⚠️ {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData, address};

    fn account() -> Address {
        address!("1111111111111111111111111111111111111111")
    }

    fn pool_log(topics: Vec<B256>, data: Bytes) -> Log {
        Log::new(CONFIG.pool_address, topics, data).expect("valid log shape")
    }

    #[test]
    fn decodes_each_activity_kind() {
        let cases = [
            (*SUPPLY_TOPIC, ActivityKind::Supply),
            (*WITHDRAW_TOPIC, ActivityKind::Withdraw),
            (*BORROW_TOPIC, ActivityKind::Borrow),
            (*REPAY_TOPIC, ActivityKind::Repay),
        ];

        for (topic, expected) in cases {
            let log = pool_log(
                vec![
                    topic,
                    address!("2222222222222222222222222222222222222222").into_word(),
                    account().into_word(),
                ],
                Bytes::new(),
            );
            match decode_protocol_event(&log, None) {
                Ok(Some(ProtocolNotification::RoutineActivity { account: got, kind })) => {
                    assert_eq!(got, account());
                    assert_eq!(kind, expected);
                }
                other => panic!("unexpected decode result: {:?}", other),
            }
        }
    }

    #[test]
    fn decodes_liquidation_call_event() {
        let collateral = address!("2222222222222222222222222222222222222222");
        let debt = address!("3333333333333333333333333333333333333333");
        let liquidator = address!("4444444444444444444444444444444444444444");
        let tx = B256::repeat_byte(0xab);

        let data = (
            U256::from(1_000_000u64),
            U256::from(500_000u64),
            liquidator,
            true,
        )
            .abi_encode();
        let log = pool_log(
            vec![
                *LIQUIDATION_CALL_TOPIC,
                collateral.into_word(),
                debt.into_word(),
                account().into_word(),
            ],
            data.into(),
        );

        match decode_protocol_event(&log, Some(tx)) {
            Ok(Some(ProtocolNotification::ConfirmedLiquidation(details))) => {
                assert_eq!(details.account, account());
                assert_eq!(details.collateral_asset, collateral);
                assert_eq!(details.debt_asset, debt);
                assert_eq!(details.debt_to_cover, U256::from(1_000_000u64));
                assert_eq!(details.liquidated_collateral, U256::from(500_000u64));
                assert_eq!(details.liquidator, liquidator);
                assert!(details.receive_atoken);
                assert_eq!(details.tx_hash, Some(tx));
            }
            other => panic!("unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn ignores_unwatched_event_topics() {
        let log = pool_log(
            vec![
                alloy::primitives::keccak256("Transfer(address,address,uint256)"),
                account().into_word(),
            ],
            Bytes::new(),
        );
        assert!(matches!(decode_protocol_event(&log, None), Ok(None)));
    }

    #[test]
    fn ignores_anonymous_logs() {
        let log = Log {
            address: CONFIG.pool_address,
            data: LogData::new_unchecked(vec![], Bytes::new()),
        };
        assert!(matches!(decode_protocol_event(&log, None), Ok(None)));
    }

    #[test]
    fn activity_log_missing_account_topic_is_a_decode_error() {
        let log = pool_log(vec![*SUPPLY_TOPIC, account().into_word()], Bytes::new());
        assert!(matches!(
            decode_protocol_event(&log, None),
            Err(WatchError::Decode { .. })
        ));
    }

    #[test]
    fn liquidation_log_with_truncated_data_is_a_decode_error() {
        let log = pool_log(
            vec![
                *LIQUIDATION_CALL_TOPIC,
                account().into_word(),
                account().into_word(),
                account().into_word(),
            ],
            Bytes::from(vec![0u8; 7]),
        );
        assert!(matches!(
            decode_protocol_event(&log, None),
            Err(WatchError::Decode { .. })
        ));
    }

    #[test]
    fn liquidation_alert_names_both_parties() {
        let details = LiquidationDetails {
            account: account(),
            collateral_asset: address!("2222222222222222222222222222222222222222"),
            debt_asset: address!("3333333333333333333333333333333333333333"),
            debt_to_cover: U256::from(42u64),
            liquidated_collateral: U256::from(21u64),
            liquidator: address!("4444444444444444444444444444444444444444"),
            receive_atoken: false,
            tx_hash: Some(B256::repeat_byte(0x01)),
        };
        let message = render_liquidation_alert(&details);
        assert!(message.contains(&details.account.to_string()));
        assert!(message.contains(&details.liquidator.to_string()));
        assert!(message.contains("Tx:"));
    }
}
