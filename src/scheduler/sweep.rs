//! Periodic full-registry sweep

use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::scheduler::engine::{HealthScheduler, NotifyOutcome};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    pub scheduled: usize,
    pub in_flight: usize,
    pub debounced: usize,
    pub rejected: usize,
    pub queued: usize,
}

/// One pass over every known account. Issues at most one notify per
/// account; admission filters out everything already covered.
pub async fn run_sweep_pass(scheduler: &HealthScheduler) -> SweepSummary {
    let accounts = scheduler.known_accounts().await;
    let mut summary = SweepSummary {
        examined: accounts.len(),
        ..Default::default()
    };

    for address in accounts {
        match scheduler.notify(address).await {
            NotifyOutcome::Scheduled => summary.scheduled += 1,
            NotifyOutcome::InFlight => summary.in_flight += 1,
            NotifyOutcome::Debounced => summary.debounced += 1,
            NotifyOutcome::AtCapacity => summary.rejected += 1,
            NotifyOutcome::Queued => summary.queued += 1,
        }
    }

    summary
}

/// Sweep timer task. Each pass runs inline on this task, so a new tick
/// can never overlap a pass still in progress; ticks missed while a
/// pass runs long are dropped rather than bunched.
pub async fn run_full_sweep(scheduler: HealthScheduler, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let summary = run_sweep_pass(&scheduler).await;
        if summary.examined > 0 {
            info!(
                "🧹 Sweep: {} accounts, {} scheduled, {} in flight, {} debounced, {} rejected, {} queued",
                summary.examined,
                summary.scheduled,
                summary.in_flight,
                summary.debounced,
                summary.rejected,
                summary.queued
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::AlertDispatcher;
    use crate::errors::WatchResult;
    use crate::scheduler::engine::SchedulerSettings;
    use crate::solvency::HealthSource;
    use crate::types::WatchStats;
    use alloy::primitives::Address;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::yield_now;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    async fn settle() {
        for _ in 0..50 {
            yield_now().await;
        }
    }

    struct HealthySource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HealthSource for HealthySource {
        async fn query(&self, _account: Address) -> WatchResult<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(dec!(1.8))
        }
    }

    fn sweep_scheduler(settings: SchedulerSettings) -> (HealthScheduler, Arc<HealthySource>) {
        let source = Arc::new(HealthySource {
            calls: AtomicUsize::new(0),
        });
        let stats = Arc::new(WatchStats::new());
        let (alerts, _rx) = AlertDispatcher::channel(stats.clone());
        let scheduler = HealthScheduler::new(source.clone(), alerts, stats, settings);
        (scheduler, source)
    }

    #[tokio::test]
    async fn sweep_covers_each_tracked_account_once() {
        let settings = SchedulerSettings {
            concurrency_cap: 16,
            ..Default::default()
        };
        let (scheduler, source) = sweep_scheduler(settings);
        let accounts: Vec<Address> = (1..=5).map(addr).collect();
        scheduler.track_accounts(&accounts).await;

        let summary = run_sweep_pass(&scheduler).await;
        assert_eq!(summary.examined, 5);
        assert_eq!(summary.scheduled, 5);
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);

        let repeat = run_sweep_pass(&scheduler).await;
        assert_eq!(repeat.debounced, 5);
        assert_eq!(repeat.scheduled, 0);
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn sweep_respects_concurrency_cap() {
        struct ParkedSource;

        #[async_trait]
        impl HealthSource for ParkedSource {
            async fn query(&self, _account: Address) -> WatchResult<Decimal> {
                std::future::pending::<()>().await;
                Ok(dec!(1.8))
            }
        }

        let settings = SchedulerSettings {
            concurrency_cap: 2,
            ..Default::default()
        };
        let stats = Arc::new(WatchStats::new());
        let (alerts, _rx) = AlertDispatcher::channel(stats.clone());
        let scheduler = HealthScheduler::new(Arc::new(ParkedSource), alerts, stats, settings);
        let accounts: Vec<Address> = (1..=5).map(addr).collect();
        scheduler.track_accounts(&accounts).await;

        let summary = run_sweep_pass(&scheduler).await;
        assert_eq!(summary.examined, 5);
        assert_eq!(summary.scheduled, 2);
        assert_eq!(summary.rejected, 3);
        assert_eq!(scheduler.in_flight_count().await, 2);
    }

    #[tokio::test]
    async fn sweep_over_empty_registry_is_a_no_op() {
        let (scheduler, source) = sweep_scheduler(SchedulerSettings::default());
        let summary = run_sweep_pass(&scheduler).await;
        assert_eq!(summary, SweepSummary::default());
        settle().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
