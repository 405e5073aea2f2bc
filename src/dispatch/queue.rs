//! FIFO alert queue with paced single-consumer delivery

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use crate::{
    dispatch::telegram::Notifier,
    storage,
    types::{AlertRecord, PendingAlert, WatchStats},
};

#[derive(Clone)]
pub struct AlertDispatcher {
    tx: UnboundedSender<PendingAlert>,
    stats: Arc<WatchStats>,
}

impl AlertDispatcher {
    /// Queue half without a drain task. Lets tests inspect exactly what
    /// gets enqueued.
    pub fn channel(stats: Arc<WatchStats>) -> (Self, UnboundedReceiver<PendingAlert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, stats }, rx)
    }

    pub fn start(
        notifier: Notifier,
        spacing: Duration,
        stats: Arc<WatchStats>,
    ) -> (Self, JoinHandle<()>) {
        let (dispatcher, rx) = Self::channel(stats.clone());
        let handle = tokio::spawn(run_drain(rx, notifier, spacing, stats));
        (dispatcher, handle)
    }

    pub fn enqueue(&self, message: String) {
        let alert = PendingAlert::new(message);
        self.stats.alerts_enqueued.fetch_add(1, Ordering::Relaxed);
        debug!(alert_id = %alert.id, "Alert enqueued");
        if self.tx.send(alert).is_err() {
            error!("Alert queue receiver dropped; alert lost");
        }
    }
}

/// Single consumer: at most one delivery in flight, at least `spacing`
/// between consecutive attempts, failures dropped after logging.
async fn run_drain(
    mut rx: UnboundedReceiver<PendingAlert>,
    notifier: Notifier,
    spacing: Duration,
    stats: Arc<WatchStats>,
) {
    info!(
        "📬 Alert dispatcher running ({} channel, {}ms spacing)",
        notifier.describe(),
        spacing.as_millis()
    );

    while let Some(alert) = rx.recv().await {
        let queue_wait_ms = alert.queued_at.elapsed().as_millis() as u64;
        let attempt_started = tokio::time::Instant::now();
        let outcome = notifier.deliver(&alert.message).await;
        let delivery_ms = attempt_started.elapsed().as_millis() as u64;

        let delivered = match outcome {
            Ok(()) => {
                stats.alerts_delivered.fetch_add(1, Ordering::Relaxed);
                debug!(alert_id = %alert.id, queue_wait_ms, delivery_ms, "Alert delivered");
                true
            }
            Err(e) => {
                stats.alerts_dropped.fetch_add(1, Ordering::Relaxed);
                error!(alert_id = %alert.id, "Dropping alert after failed delivery: {}", e);
                false
            }
        };

        if let Err(e) = storage::save_alert_record(&AlertRecord {
            id: alert.id.clone(),
            timestamp: alert.created_at,
            message: alert.message.clone(),
            delivered,
            queue_wait_ms,
            delivery_ms,
        }) {
            error!("Failed to save alert record: {}", e);
        }

        tokio::time::sleep(spacing).await;
    }

    debug!("Alert queue closed; dispatcher exiting");
}
