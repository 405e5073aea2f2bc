//! Owned account registry and admission gate

use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use crate::types::AccountRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    AlreadyInFlight,
    Debounced,
    AtCapacity,
}

/// Outcome of folding a finished check back into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckDecision {
    Unchanged,
    UpdatedHealthy { recovered: bool },
    UpdatedAtRisk { previous: Decimal },
}

/// All per-account state the scheduler owns. Purely synchronous; callers
/// hold it behind their own lock, tests construct isolated instances.
pub struct AccountRegistry {
    accounts: HashMap<Address, AccountRecord>,
    in_flight_total: usize,
    max_tracked: usize,
}

impl AccountRegistry {
    /// `max_tracked` of 0 disables eviction.
    pub fn new(max_tracked: usize) -> Self {
        Self {
            accounts: HashMap::new(),
            in_flight_total: 0,
            max_tracked,
        }
    }

    /// Ensures a record exists without scheduling anything.
    pub fn track(&mut self, address: Address) {
        if !self.accounts.contains_key(&address) {
            self.evict_if_full();
            self.accounts.insert(address, AccountRecord::new());
        }
    }

    /// The admission pipeline, in order: in-flight, debounce, capacity.
    /// On `Admitted` the record is already marked in flight and stamped,
    /// and the global counter is bumped.
    pub fn try_admit(
        &mut self,
        address: Address,
        now: Instant,
        debounce_window: Duration,
        concurrency_cap: usize,
    ) -> Admission {
        self.track(address);
        let record = self.accounts.entry(address).or_default();

        if record.in_flight {
            return Admission::AlreadyInFlight;
        }
        if let Some(last) = record.last_checked {
            if now.duration_since(last) < debounce_window {
                return Admission::Debounced;
            }
        }
        if self.in_flight_total >= concurrency_cap {
            return Admission::AtCapacity;
        }

        record.in_flight = true;
        record.last_checked = Some(now);
        self.in_flight_total += 1;
        Admission::Admitted
    }

    /// Releases the in-flight slot. Runs on every completion path,
    /// success or error.
    pub fn finish(&mut self, address: Address) {
        if let Some(record) = self.accounts.get_mut(&address) {
            if record.in_flight {
                record.in_flight = false;
                self.in_flight_total = self.in_flight_total.saturating_sub(1);
            }
        }
    }

    /// Updates the stored metric and decides whether the change warrants
    /// an alert: only a changed value at or below the threshold does.
    pub fn record_result(
        &mut self,
        address: Address,
        metric: Decimal,
        threshold: Decimal,
    ) -> CheckDecision {
        let Some(record) = self.accounts.get_mut(&address) else {
            return CheckDecision::Unchanged;
        };

        let previous = record.last_metric;
        if metric == previous {
            return CheckDecision::Unchanged;
        }
        record.last_metric = metric;

        if metric <= threshold {
            CheckDecision::UpdatedAtRisk { previous }
        } else {
            CheckDecision::UpdatedHealthy {
                recovered: previous <= threshold,
            }
        }
    }

    pub fn known_accounts(&self) -> Vec<Address> {
        self.accounts.keys().copied().collect()
    }

    pub fn get(&self, address: &Address) -> Option<&AccountRecord> {
        self.accounts.get(address)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn in_flight_total(&self) -> usize {
        self.in_flight_total
    }

    /// Evicts the least-recently-checked idle record. In-flight records
    /// are never evicted; if everything is in flight the map overshoots
    /// by one instead of blocking admission.
    fn evict_if_full(&mut self) {
        if self.max_tracked == 0 || self.accounts.len() < self.max_tracked {
            return;
        }
        let victim = self
            .accounts
            .iter()
            .filter(|(_, record)| !record.in_flight)
            .min_by_key(|(_, record)| record.last_checked)
            .map(|(address, _)| *address);
        if let Some(address) = victim {
            self.accounts.remove(&address);
        }
    }
}
