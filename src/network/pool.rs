//! Redundant feed connection pool with active-role failover

use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};
use crate::{
    network::endpoint::{EndpointSlot, EndpointState, TransportEvent},
    types::WatchStats,
    FeedProvider,
};

#[derive(Clone)]
pub struct ActiveFeed {
    pub label: String,
    pub index: usize,
    pub generation: u64,
    pub provider: Arc<FeedProvider>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverOutcome {
    Unchanged,
    Promoted(usize),
    NullRoute,
}

/// Pure connection-lifecycle state. Exactly one `Open` slot holds the
/// active role while any slot is `Open`; `active` is `None` otherwise.
/// `generation` bumps on every promotion or loss of the active feed so
/// subscribers can tell a new assignment from the one they hold.
pub struct PoolState {
    pub slots: Vec<EndpointSlot>,
    pub active: Option<usize>,
    pub generation: u64,
}

impl PoolState {
    pub fn new(endpoints: &[(String, String)]) -> Self {
        Self {
            slots: endpoints
                .iter()
                .map(|(label, url)| EndpointSlot::new(label.clone(), url.clone()))
                .collect(),
            active: None,
            generation: 0,
        }
    }

    /// Single entry point for every lifecycle transition.
    pub fn apply(
        &mut self,
        index: usize,
        event: TransportEvent,
        provider: Option<Arc<FeedProvider>>,
    ) -> FailoverOutcome {
        {
            let slot = &mut self.slots[index];
            match event {
                TransportEvent::Dialing => {
                    slot.state = EndpointState::Connecting;
                    slot.provider = None;
                }
                TransportEvent::Opened => {
                    slot.state = EndpointState::Open;
                    slot.provider = provider;
                }
                TransportEvent::Closed => {
                    slot.state = EndpointState::Closed;
                    slot.provider = None;
                }
                TransportEvent::Errored => {
                    slot.state = EndpointState::Errored;
                    slot.provider = None;
                }
            }
        }

        match event {
            // A newly opened slot only takes over when nothing holds the role.
            TransportEvent::Opened => {
                if self.active.is_none() {
                    self.promote(index)
                } else {
                    FailoverOutcome::Unchanged
                }
            }
            _ => self.handle_loss(index),
        }
    }

    fn promote(&mut self, index: usize) -> FailoverOutcome {
        self.active = Some(index);
        self.generation += 1;
        FailoverOutcome::Promoted(index)
    }

    fn handle_loss(&mut self, index: usize) -> FailoverOutcome {
        if self.active != Some(index) {
            return FailoverOutcome::Unchanged;
        }
        match self
            .slots
            .iter()
            .position(|s| s.state == EndpointState::Open)
        {
            Some(standby) => self.promote(standby),
            None => {
                self.active = None;
                self.generation += 1;
                FailoverOutcome::NullRoute
            }
        }
    }
}

pub struct ConnectionPool {
    state: RwLock<PoolState>,
    generation_tx: watch::Sender<u64>,
    stats: Arc<WatchStats>,
}

impl ConnectionPool {
    pub fn new(endpoints: &[(String, String)], stats: Arc<WatchStats>) -> Arc<Self> {
        let (generation_tx, _) = watch::channel(0);
        Arc::new(Self {
            state: RwLock::new(PoolState::new(endpoints)),
            generation_tx,
            stats,
        })
    }

    pub async fn endpoint_info(&self, index: usize) -> (String, String) {
        let state = self.state.read().await;
        (
            state.slots[index].label.clone(),
            state.slots[index].url.clone(),
        )
    }

    pub async fn on_transport_event(
        &self,
        index: usize,
        event: TransportEvent,
        provider: Option<Arc<FeedProvider>>,
    ) {
        let mut state = self.state.write().await;
        debug!(
            "Feed '{}' transport event: {:?}",
            state.slots[index].label, event
        );

        match state.apply(index, event, provider) {
            FailoverOutcome::Unchanged => {}
            FailoverOutcome::Promoted(new_index) => {
                info!(
                    "🔀 Feed '{}' promoted to active (generation {})",
                    state.slots[new_index].label, state.generation
                );
                if matches!(event, TransportEvent::Closed | TransportEvent::Errored) {
                    self.stats.failovers.fetch_add(1, Ordering::Relaxed);
                }
                let _ = self.generation_tx.send(state.generation);
            }
            FailoverOutcome::NullRoute => {
                warn!(
                    "🕳️ No open feed connections remain (generation {})",
                    state.generation
                );
                self.stats.failovers.fetch_add(1, Ordering::Relaxed);
                let _ = self.generation_tx.send(state.generation);
            }
        }
    }

    /// The feed currently holding the active role, if any. Callers must
    /// handle `None`: the pool null-routes while no connection is open.
    pub async fn active(&self) -> Option<ActiveFeed> {
        let state = self.state.read().await;
        let index = state.active?;
        let slot = &state.slots[index];
        let provider = slot.provider.clone()?;
        Some(ActiveFeed {
            label: slot.label.clone(),
            index,
            generation: state.generation,
            provider,
        })
    }

    pub async fn active_label(&self) -> Option<String> {
        let state = self.state.read().await;
        state.active.map(|i| state.slots[i].label.clone())
    }

    pub async fn open_count(&self) -> usize {
        self.state
            .read()
            .await
            .slots
            .iter()
            .filter(|s| s.state == EndpointState::Open)
            .count()
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Subscribe to generation bumps. Receivers re-read `active()` on
    /// every change and re-subscribe their feeds.
    pub fn watch_generation(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }
}
