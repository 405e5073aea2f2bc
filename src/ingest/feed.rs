//! Active-feed change tracking for subscription loops

use tokio::sync::watch;

/// What a subscription loop should do once the pool's generation moves
/// past the one its subscription was built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedChange {
    Resubscribe,
    Shutdown,
}

/// Waits for a generation bump that outdates `held_generation`.
/// Announcements of the generation already held are skipped; a dropped
/// sender means the pool is gone and the loop should exit.
pub async fn next_feed_change(
    generation_rx: &mut watch::Receiver<u64>,
    held_generation: u64,
) -> FeedChange {
    loop {
        if generation_rx.changed().await.is_err() {
            return FeedChange::Shutdown;
        }
        if *generation_rx.borrow() != held_generation {
            return FeedChange::Resubscribe;
        }
    }
}
