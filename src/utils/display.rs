//! Display and printing utilities

use rust_decimal::Decimal;
use tracing::{info, warn};
use crate::types::{LiquidationDetails, METRIC_UNKNOWN, StatsSnapshot, WatcherStatus};

pub fn format_metric(metric: Decimal) -> String {
    if metric == METRIC_UNKNOWN {
        "unknown".to_string()
    } else {
        format!("{:.4}", metric)
    }
}

pub fn print_session_stats(status: &WatcherStatus, stats: &StatsSnapshot) {
    info!("\n📊 Watcher Status ({} minutes)", status.uptime_seconds / 60);
    info!("   📡 FEEDS:");
    info!("     Active: {}", status.active_feed.as_deref().unwrap_or("none"));
    info!("     Open connections: {}", status.open_feeds);
    info!("     Failovers: {}", stats.failovers);
    info!("   ❤️  HEALTH CHECKS:");
    info!("     Tracked accounts: {}", status.tracked_accounts);
    info!("     In flight: {}", status.in_flight_checks);
    info!("     Completed: {} ({} failed)", stats.checks_completed, stats.checks_failed);
    info!("     Debounced: {}", stats.debounced);
    info!("     Capacity rejections: {}", stats.capacity_rejections);
    info!("     Overflow queued: {}", stats.overflow_queued);
    info!("   🚨 ALERTS:");
    info!("     Enqueued: {}", stats.alerts_enqueued);
    info!("     Delivered: {}", stats.alerts_delivered);
    info!("     Dropped: {}", stats.alerts_dropped);
    info!("   ⚙️  INGESTION:");
    info!("     Notifications seen: {}", stats.notifications_seen);
    info!("     Liquidations observed: {}", stats.liquidations_seen);
    info!("     Decode failures: {}", stats.decode_failures);
    info!("");
}

pub fn print_liquidation_event(details: &LiquidationDetails) {
    warn!("\n💥 LIQUIDATION EXECUTED");
    warn!("📍 Account: {}", details.account);
    warn!("   Collateral asset: {}", details.collateral_asset);
    warn!("   Debt asset: {}", details.debt_asset);
    warn!("   Debt covered: {}", details.debt_to_cover);
    warn!("   Collateral seized: {}", details.liquidated_collateral);
    warn!("   Liquidator: {}", details.liquidator);
    if let Some(hash) = details.tx_hash {
        warn!("   Tx: {}", hash);
    }
}
