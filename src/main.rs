//! Aave v3 Liquidation Risk Watcher - Main Entry Point
//!
//! Watches Aave v3 on Base for accounts sliding toward liquidation

use aave_liq_watch_bot::*;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    let _logging_guard = utils::setup_logging()?;
    utils::setup_output_directories()?;

    // Load configuration
    let config = CONFIG.clone();

    info!("🛰️  Aave v3 Liquidation Risk Watcher v0.4.0 - Base Network");
    info!("📋 Configuration:");
    info!("   Pool contract: {}", config.pool_address);
    info!("   Feed endpoints: {}", config.feed_endpoints.len());
    for (label, _) in &config.feed_endpoints {
        info!("     - {}", label);
    }
    info!("   Health threshold: {}", config.health_threshold);
    info!("   Debounce window: {}s", config.debounce_secs);
    info!("   Concurrent check cap: {}", config.max_concurrent_checks);
    info!("   Full sweep interval: {}s", config.full_sweep_interval_secs);
    info!("   Overflow policy: {:?}", config.overflow_policy);
    info!("   Seeded accounts: {}", config.watch_accounts.len());
    if config.dry_run {
        info!("   ⚠️  DRY RUN MODE - Alerts go to the log only");
    }

    // pause briefly so the configuration is readable before the feed logs start
    tokio::time::sleep(Duration::from_secs(3)).await;

    // Validate configuration
    if config.feed_endpoints.is_empty() {
        return Err(anyhow::anyhow!(
            "No feed endpoints configured; set PRIMARY_WS_URL or ALCHEMY_API_KEY"
        ));
    }

    // Initialize components
    let stats = Arc::new(WatchStats::new());
    let pool = network::ConnectionPool::new(&config.feed_endpoints, stats.clone());
    let supervisors = network::spawn_endpoint_supervisors(&pool, config.feed_endpoints.len());
    info!("🔌 Supervising {} feed endpoint(s)", supervisors.len());

    let notifier = dispatch::Notifier::from_config(&config);
    info!("📨 Alert channel: {}", notifier.describe());
    let (alerts, _dispatch_handle) = dispatch::AlertDispatcher::start(
        notifier,
        Duration::from_secs(config.min_alert_spacing_secs),
        stats.clone(),
    );

    let source = Arc::new(solvency::ChainHealthSource::new(
        pool.clone(),
        config.pool_address,
        Duration::from_secs(config.query_timeout_secs),
    ));
    let scheduler = scheduler::HealthScheduler::new(
        source,
        alerts.clone(),
        stats.clone(),
        scheduler::SchedulerSettings::from_config(&config),
    );

    scheduler.track_accounts(&config.watch_accounts).await;
    if !config.watch_accounts.is_empty() {
        info!("👀 Tracking {} seeded account(s)", config.watch_accounts.len());
    }

    // Ingestion and sweep tasks
    tokio::spawn(ingest::run_event_ingestion(
        pool.clone(),
        scheduler.clone(),
        alerts.clone(),
        stats.clone(),
    ));
    tokio::spawn(ingest::run_pending_ingestion(pool.clone(), scheduler.clone()));
    tokio::spawn(scheduler::run_full_sweep(
        scheduler.clone(),
        config.full_sweep_interval_secs,
    ));

    // Setup shutdown handler
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
    let shutdown_tx = Arc::new(tokio::sync::Mutex::new(Some(shutdown_tx)));

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("\n📛 Received shutdown signal (Ctrl+C)...");
        if let Some(tx) = shutdown_tx.lock().await.take() {
            let _ = tx.send(());
        }
    });

    info!("\n🚀 Watching for protocol activity...\n");

    let start_time = Instant::now();
    let mut status_interval = time::interval(Duration::from_secs(60));
    status_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    status_interval.tick().await; // consume the immediate first tick

    // Main status loop; all real work happens on the spawned tasks
    loop {
        tokio::select! {
            _ = status_interval.tick() => {
                let status = WatcherStatus {
                    active_feed: pool.active_label().await,
                    open_feeds: pool.open_count().await,
                    tracked_accounts: scheduler.tracked_count().await,
                    in_flight_checks: scheduler.in_flight_count().await,
                    uptime_seconds: start_time.elapsed().as_secs(),
                };
                utils::print_session_stats(&status, &stats.snapshot());
            }
            _ = &mut shutdown_rx => {
                info!("Shutdown signal received, exiting main loop...");
                break;
            }
        }
    }

    // Print final statistics
    print_final_statistics(start_time, &stats.snapshot());

    Ok(())
}

/// Print final statistics on shutdown
fn print_final_statistics(start_time: Instant, stats: &StatsSnapshot) {
    info!("\n🛑 Shutting down gracefully...");
    info!("Final statistics:");
    info!("   Total runtime: {:?}", start_time.elapsed());
    info!("   Notifications processed: {}", stats.notifications_seen);
    info!(
        "   Health checks completed: {} ({} failed)",
        stats.checks_completed, stats.checks_failed
    );
    info!("   Debounced: {}", stats.debounced);
    info!("   Capacity rejections: {}", stats.capacity_rejections);
    info!("   Overflow queued: {}", stats.overflow_queued);
    info!(
        "   Alerts delivered: {} ({} dropped)",
        stats.alerts_delivered, stats.alerts_dropped
    );
    info!("   Liquidations observed: {}", stats.liquidations_seen);
    info!("   Feed failovers: {}", stats.failovers);
    info!("   Decode failures: {}", stats.decode_failures);
}
