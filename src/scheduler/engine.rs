//! Account health check scheduling

use alloy::primitives::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{Config, OverflowPolicy};
use crate::dispatch::AlertDispatcher;
use crate::scheduler::registry::{AccountRegistry, Admission, CheckDecision};
use crate::solvency::HealthSource;
use crate::types::{METRIC_UNKNOWN, WatchStats};
use crate::utils::format_metric;

/// Scheduler knobs, split out of the global config so tests can build
/// tight configurations.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub debounce_window: Duration,
    pub concurrency_cap: usize,
    pub health_threshold: Decimal,
    pub overflow_policy: OverflowPolicy,
    pub overflow_queue_size: usize,
    pub max_tracked_accounts: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce_window: Duration::from_secs(config.debounce_secs),
            concurrency_cap: config.max_concurrent_checks,
            health_threshold: config.health_threshold,
            overflow_policy: config.overflow_policy,
            overflow_queue_size: config.overflow_queue_size,
            max_tracked_accounts: config.max_tracked_accounts,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_secs(30),
            concurrency_cap: 4,
            health_threshold: dec!(1.05),
            overflow_policy: OverflowPolicy::Drop,
            overflow_queue_size: 64,
            max_tracked_accounts: 0,
        }
    }
}

/// What `notify` did with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Scheduled,
    InFlight,
    Debounced,
    AtCapacity,
    Queued,
}

struct SchedulerState {
    registry: AccountRegistry,
    waiting: VecDeque<Address>,
}

/// Debounced, capacity-limited health check scheduler. Clones share
/// state, so ingestion tasks and the sweep can hold their own handle.
#[derive(Clone)]
pub struct HealthScheduler {
    state: Arc<Mutex<SchedulerState>>,
    source: Arc<dyn HealthSource>,
    alerts: AlertDispatcher,
    stats: Arc<WatchStats>,
    settings: Arc<SchedulerSettings>,
}

impl HealthScheduler {
    pub fn new(
        source: Arc<dyn HealthSource>,
        alerts: AlertDispatcher,
        stats: Arc<WatchStats>,
        settings: SchedulerSettings,
    ) -> Self {
        let registry = AccountRegistry::new(settings.max_tracked_accounts);
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                registry,
                waiting: VecDeque::new(),
            })),
            source,
            alerts,
            stats,
            settings: Arc::new(settings),
        }
    }

    /// Registers accounts without checking them; the next sweep or
    /// activity signal covers them.
    pub async fn track_accounts(&self, accounts: &[Address]) {
        let mut state = self.state.lock().await;
        for address in accounts {
            state.registry.track(*address);
        }
    }

    pub async fn known_accounts(&self) -> Vec<Address> {
        self.state.lock().await.registry.known_accounts()
    }

    pub async fn tracked_count(&self) -> usize {
        self.state.lock().await.registry.len()
    }

    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.registry.in_flight_total()
    }

    /// Entry point for every "look at this account" signal. The whole
    /// admission decision happens under one lock; the check itself runs
    /// on a spawned task so callers never wait on the RPC.
    pub async fn notify(&self, address: Address) -> NotifyOutcome {
        self.stats.notifications_seen.fetch_add(1, Ordering::Relaxed);

        let outcome = {
            let mut state = self.state.lock().await;
            match state.registry.try_admit(
                address,
                Instant::now(),
                self.settings.debounce_window,
                self.settings.concurrency_cap,
            ) {
                Admission::Admitted => NotifyOutcome::Scheduled,
                Admission::AlreadyInFlight => NotifyOutcome::InFlight,
                Admission::Debounced => NotifyOutcome::Debounced,
                Admission::AtCapacity => self.enqueue_waiting(&mut state, address),
            }
        };

        match outcome {
            NotifyOutcome::Scheduled => {
                self.stats.checks_started.fetch_add(1, Ordering::Relaxed);
                self.spawn_check(address);
            }
            NotifyOutcome::InFlight => {
                debug!("Check already in flight for {}", address);
            }
            NotifyOutcome::Debounced => {
                self.stats.debounced.fetch_add(1, Ordering::Relaxed);
                debug!("Debounced notification for {}", address);
            }
            NotifyOutcome::AtCapacity => {
                self.stats.capacity_rejections.fetch_add(1, Ordering::Relaxed);
                debug!("Concurrency cap reached, dropping notification for {}", address);
            }
            NotifyOutcome::Queued => {
                self.stats.overflow_queued.fetch_add(1, Ordering::Relaxed);
                debug!("Concurrency cap reached, queued {}", address);
            }
        }

        outcome
    }

    fn enqueue_waiting(&self, state: &mut SchedulerState, address: Address) -> NotifyOutcome {
        if self.settings.overflow_policy != OverflowPolicy::Queue {
            return NotifyOutcome::AtCapacity;
        }
        if state.waiting.contains(&address) {
            return NotifyOutcome::Queued;
        }
        if state.waiting.len() >= self.settings.overflow_queue_size {
            return NotifyOutcome::AtCapacity;
        }
        state.waiting.push_back(address);
        NotifyOutcome::Queued
    }

    fn spawn_check(&self, address: Address) {
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_check(address).await;
        });
    }

    /// One health check, start to finish. The in-flight slot is released
    /// on every path before the result is acted on, and a waiting address
    /// gets the freed slot afterwards.
    async fn run_check(&self, address: Address) {
        let result = self.source.query(address).await;

        let (decision, next_waiting) = {
            let mut state = self.state.lock().await;
            state.registry.finish(address);
            let decision = match &result {
                Ok(metric) => Some(state.registry.record_result(
                    address,
                    *metric,
                    self.settings.health_threshold,
                )),
                Err(_) => None,
            };
            (decision, state.waiting.pop_front())
        };

        match result {
            Ok(metric) => {
                self.stats.checks_completed.fetch_add(1, Ordering::Relaxed);
                match decision.unwrap_or(CheckDecision::Unchanged) {
                    CheckDecision::UpdatedAtRisk { previous } => {
                        warn!(
                            "🚨 Account {} at risk: health factor {} (threshold {})",
                            address,
                            format_metric(metric),
                            self.settings.health_threshold
                        );
                        self.alerts.enqueue(render_risk_alert(
                            address,
                            metric,
                            self.settings.health_threshold,
                            previous,
                        ));
                    }
                    CheckDecision::UpdatedHealthy { recovered: true } => {
                        info!(
                            "✅ Account {} recovered: health factor {}",
                            address,
                            format_metric(metric)
                        );
                    }
                    CheckDecision::UpdatedHealthy { recovered: false }
                    | CheckDecision::Unchanged => {
                        debug!(
                            "Health factor for {} is {}",
                            address,
                            format_metric(metric)
                        );
                    }
                }
            }
            Err(e) => {
                self.stats.checks_failed.fetch_add(1, Ordering::Relaxed);
                warn!("⚠️ Health check failed for {}: {}", address, e);
            }
        }

        if let Some(next) = next_waiting {
            self.notify(next).await;
        }
    }
}

/// Alert text for an account at or below the threshold.
fn render_risk_alert(
    account: Address,
    metric: Decimal,
    threshold: Decimal,
    previous: Decimal,
) -> String {
    let mut message = format!(
        "🚨 <b>Liquidation risk</b>\nAccount: <code>{}</code>\nHealth factor: {} (threshold {})",
        account,
        format_metric(metric),
        threshold
    );
    if previous != METRIC_UNKNOWN {
        message.push_str(&format!("\nPrevious: {}", format_metric(previous)));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{WatchError, WatchResult};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Mutex as AsyncMutex;
    use tokio::sync::{mpsc, oneshot};
    use tokio::task::yield_now;

    fn addr(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    async fn settle() {
        for _ in 0..50 {
            yield_now().await;
        }
    }

    fn test_scheduler(
        source: Arc<dyn HealthSource>,
        settings: SchedulerSettings,
    ) -> (
        HealthScheduler,
        mpsc::UnboundedReceiver<crate::types::PendingAlert>,
        Arc<WatchStats>,
    ) {
        let stats = Arc::new(WatchStats::new());
        let (alerts, rx) = AlertDispatcher::channel(stats.clone());
        let scheduler = HealthScheduler::new(source, alerts, stats.clone(), settings);
        (scheduler, rx, stats)
    }

    /// Answers immediately from a fixed script of metrics, then stays
    /// healthy.
    struct ScriptedSource {
        script: AsyncMutex<VecDeque<Decimal>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(metrics: &[Decimal]) -> Arc<Self> {
            Arc::new(Self {
                script: AsyncMutex::new(metrics.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthSource for ScriptedSource {
        async fn query(&self, _account: Address) -> WatchResult<Decimal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().await;
            Ok(script.pop_front().unwrap_or(dec!(2.0)))
        }
    }

    /// Parks every query until the test releases it, so concurrency is
    /// observable.
    struct GatedSource {
        started: AtomicUsize,
        gates: AsyncMutex<Vec<oneshot::Sender<Decimal>>>,
    }

    impl GatedSource {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                started: AtomicUsize::new(0),
                gates: AsyncMutex::new(Vec::new()),
            })
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        async fn release_one(&self, metric: Decimal) -> bool {
            let mut gates = self.gates.lock().await;
            match gates.pop() {
                Some(tx) => {
                    let _ = tx.send(metric);
                    true
                }
                None => false,
            }
        }
    }

    #[async_trait]
    impl HealthSource for GatedSource {
        async fn query(&self, account: Address) -> WatchResult<Decimal> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().await.push(tx);
            self.started.fetch_add(1, Ordering::SeqCst);
            rx.await.map_err(|_| WatchError::Query {
                account,
                message: "gate dropped".to_string(),
                source: None,
            })
        }
    }

    #[tokio::test]
    async fn first_risky_reading_emits_one_alert() {
        let source = ScriptedSource::new(&[dec!(0.98)]);
        let (scheduler, mut alerts_rx, _stats) =
            test_scheduler(source.clone(), SchedulerSettings::default());

        assert_eq!(scheduler.notify(addr(1)).await, NotifyOutcome::Scheduled);
        settle().await;

        let alert = alerts_rx.try_recv().expect("one alert should be queued");
        assert!(alert.message.contains(&addr(1).to_string()));
        assert!(alert.message.contains("0.98"));
        assert!(alerts_rx.try_recv().is_err());
        assert_eq!(source.calls(), 1);
        assert_eq!(scheduler.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_notify_within_debounce_skips_query() {
        let source = ScriptedSource::new(&[dec!(1.50)]);
        let (scheduler, _alerts_rx, stats) =
            test_scheduler(source.clone(), SchedulerSettings::default());

        scheduler.notify(addr(1)).await;
        settle().await;

        assert_eq!(scheduler.notify(addr(1)).await, NotifyOutcome::Debounced);
        settle().await;

        assert_eq!(source.calls(), 1);
        assert_eq!(stats.debounced.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn notify_while_check_runs_reports_in_flight() {
        let source = GatedSource::new();
        let (scheduler, _alerts_rx, _stats) =
            test_scheduler(source.clone(), SchedulerSettings::default());

        scheduler.notify(addr(1)).await;
        settle().await;
        assert_eq!(source.started(), 1);

        assert_eq!(scheduler.notify(addr(1)).await, NotifyOutcome::InFlight);

        source.release_one(dec!(1.5)).await;
        settle().await;
        assert_eq!(source.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_metric_after_debounce_does_not_realert() {
        let source = ScriptedSource::new(&[dec!(0.98), dec!(0.98)]);
        let (scheduler, mut alerts_rx, _stats) =
            test_scheduler(source.clone(), SchedulerSettings::default());

        scheduler.notify(addr(1)).await;
        settle().await;
        assert!(alerts_rx.try_recv().is_ok());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(scheduler.notify(addr(1)).await, NotifyOutcome::Scheduled);
        settle().await;

        assert_eq!(source.calls(), 2);
        assert!(alerts_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn changed_risky_metric_alerts_again() {
        let source = ScriptedSource::new(&[dec!(0.98), dec!(0.91)]);
        let (scheduler, mut alerts_rx, _stats) =
            test_scheduler(source.clone(), SchedulerSettings::default());

        scheduler.notify(addr(1)).await;
        settle().await;
        tokio::time::advance(Duration::from_secs(31)).await;
        scheduler.notify(addr(1)).await;
        settle().await;

        assert!(alerts_rx.try_recv().is_ok());
        let second = alerts_rx.try_recv().expect("second alert for new metric");
        assert!(second.message.contains("0.91"));
    }

    #[tokio::test]
    async fn concurrency_cap_sheds_excess_notifications() {
        let source = GatedSource::new();
        let settings = SchedulerSettings {
            concurrency_cap: 4,
            ..Default::default()
        };
        let (scheduler, _alerts_rx, stats) = test_scheduler(source.clone(), settings);

        for n in 1..=4 {
            assert_eq!(scheduler.notify(addr(n)).await, NotifyOutcome::Scheduled);
        }
        settle().await;
        assert_eq!(source.started(), 4);

        assert_eq!(scheduler.notify(addr(5)).await, NotifyOutcome::AtCapacity);
        assert_eq!(stats.capacity_rejections.load(Ordering::Relaxed), 1);

        while source.release_one(dec!(1.5)).await {
            settle().await;
        }
        assert_eq!(scheduler.in_flight_count().await, 0);
        assert_eq!(source.started(), 4);
    }

    #[tokio::test]
    async fn queue_policy_admits_waiting_address_when_slot_frees() {
        let source = GatedSource::new();
        let settings = SchedulerSettings {
            concurrency_cap: 1,
            overflow_policy: OverflowPolicy::Queue,
            ..Default::default()
        };
        let (scheduler, _alerts_rx, stats) = test_scheduler(source.clone(), settings);

        assert_eq!(scheduler.notify(addr(1)).await, NotifyOutcome::Scheduled);
        settle().await;
        assert_eq!(scheduler.notify(addr(2)).await, NotifyOutcome::Queued);
        assert_eq!(scheduler.notify(addr(2)).await, NotifyOutcome::Queued);
        assert_eq!(stats.overflow_queued.load(Ordering::Relaxed), 2);
        assert_eq!(stats.capacity_rejections.load(Ordering::Relaxed), 0);

        assert!(source.release_one(dec!(1.4)).await);
        settle().await;
        assert_eq!(source.started(), 2);

        assert!(source.release_one(dec!(1.4)).await);
        settle().await;
        assert_eq!(scheduler.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn query_errors_release_the_slot_without_alerting() {
        struct FailingSource;

        #[async_trait]
        impl HealthSource for FailingSource {
            async fn query(&self, account: Address) -> WatchResult<Decimal> {
                Err(WatchError::Query {
                    account,
                    message: "boom".to_string(),
                    source: None,
                })
            }
        }

        let (scheduler, mut alerts_rx, stats) =
            test_scheduler(Arc::new(FailingSource), SchedulerSettings::default());

        scheduler.notify(addr(9)).await;
        settle().await;

        assert_eq!(stats.checks_failed.load(Ordering::Relaxed), 1);
        assert_eq!(scheduler.in_flight_count().await, 0);
        assert!(alerts_rx.try_recv().is_err());
    }
}
