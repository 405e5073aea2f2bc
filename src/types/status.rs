//! Session counters and status snapshots

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct WatchStats {
    pub notifications_seen: AtomicU64,
    pub checks_started: AtomicU64,
    pub checks_completed: AtomicU64,
    pub checks_failed: AtomicU64,
    pub debounced: AtomicU64,
    pub capacity_rejections: AtomicU64,
    pub overflow_queued: AtomicU64,
    pub alerts_enqueued: AtomicU64,
    pub alerts_delivered: AtomicU64,
    pub alerts_dropped: AtomicU64,
    pub decode_failures: AtomicU64,
    pub failovers: AtomicU64,
    pub liquidations_seen: AtomicU64,
}

impl WatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            notifications_seen: self.notifications_seen.load(Ordering::Relaxed),
            checks_started: self.checks_started.load(Ordering::Relaxed),
            checks_completed: self.checks_completed.load(Ordering::Relaxed),
            checks_failed: self.checks_failed.load(Ordering::Relaxed),
            debounced: self.debounced.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            overflow_queued: self.overflow_queued.load(Ordering::Relaxed),
            alerts_enqueued: self.alerts_enqueued.load(Ordering::Relaxed),
            alerts_delivered: self.alerts_delivered.load(Ordering::Relaxed),
            alerts_dropped: self.alerts_dropped.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            failovers: self.failovers.load(Ordering::Relaxed),
            liquidations_seen: self.liquidations_seen.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatsSnapshot {
    pub notifications_seen: u64,
    pub checks_started: u64,
    pub checks_completed: u64,
    pub checks_failed: u64,
    pub debounced: u64,
    pub capacity_rejections: u64,
    pub overflow_queued: u64,
    pub alerts_enqueued: u64,
    pub alerts_delivered: u64,
    pub alerts_dropped: u64,
    pub decode_failures: u64,
    pub failovers: u64,
    pub liquidations_seen: u64,
}

#[derive(Debug, Clone)]
pub struct WatcherStatus {
    pub active_feed: Option<String>,
    pub open_feeds: usize,
    pub tracked_accounts: usize,
    pub in_flight_checks: usize,
    pub uptime_seconds: u64,
}
