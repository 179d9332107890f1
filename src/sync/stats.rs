//! Sync pipeline progress, kept as Prometheus metrics.
//!
//! The same counters back the `/status` JSON and the `/metrics` scrape.

use std::fmt;

use prometheus::{IntCounterVec, IntGauge, Opts, Registry};
use serde::Serialize;
use utoipa::ToSchema;

const APPLIED: &str = "success";
const REJECTED: &str = "rejected";
const STORE_ERROR: &str = "store_error";
const LOST: &str = "lost";

/// Pipeline metrics shared between the consumer and the HTTP layer.
#[derive(Clone)]
pub struct SyncStats {
    events: IntCounterVec,
    connected: IntGauge,
    last_offset: IntGauge,
}

/// Serializable copy of [`SyncStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct SyncStatsSnapshot {
    /// Whether the pipeline currently holds a subscription.
    pub connected: bool,
    /// Events upserted into the store.
    pub applied: u64,
    /// Events dropped because their payload was malformed.
    pub rejected: u64,
    /// Events whose upsert failed.
    pub store_failures: u64,
    /// Records the stream reported as skipped before delivery.
    pub lost: u64,
    /// Offset of the last record the pipeline finished with.
    pub last_offset: Option<u64>,
}

impl SyncStats {
    /// Creates zeroed, unregistered metrics.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if a metric descriptor is rejected.
    pub fn new() -> Result<Self, prometheus::Error> {
        let events = IntCounterVec::new(
            Opts::new("catalog_events_consumed_total", "Item events consumed, by outcome"),
            &["status"],
        )?;
        for status in [APPLIED, REJECTED, STORE_ERROR, LOST] {
            let _ = events.with_label_values(&[status]);
        }
        let last_offset = IntGauge::new(
            "catalog_sync_last_offset",
            "Offset of the last processed event (-1 before the first)",
        )?;
        last_offset.set(-1);
        Ok(Self {
            events,
            connected: IntGauge::new(
                "catalog_sync_connected",
                "1 while the sync pipeline holds a subscription",
            )?,
            last_offset,
        })
    }

    /// Registers every metric with `registry`.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if a metric is already registered.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.events.clone()))?;
        registry.register(Box::new(self.connected.clone()))?;
        registry.register(Box::new(self.last_offset.clone()))?;
        Ok(())
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.set(i64::from(connected));
    }

    pub(crate) fn record_applied(&self) {
        self.events.with_label_values(&[APPLIED]).inc();
    }

    pub(crate) fn record_rejected(&self) {
        self.events.with_label_values(&[REJECTED]).inc();
    }

    pub(crate) fn record_store_failure(&self) {
        self.events.with_label_values(&[STORE_ERROR]).inc();
    }

    pub(crate) fn record_lost(&self, skipped: u64) {
        self.events.with_label_values(&[LOST]).inc_by(skipped);
    }

    pub(crate) fn record_offset(&self, offset: u64) {
        self.last_offset.set(i64::try_from(offset).unwrap_or(i64::MAX));
    }

    /// Reads all counters.
    #[must_use]
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        let count = |status: &str| self.events.with_label_values(&[status]).get();
        SyncStatsSnapshot {
            connected: self.connected.get() == 1,
            applied: count(APPLIED),
            rejected: count(REJECTED),
            store_failures: count(STORE_ERROR),
            lost: count(LOST),
            last_offset: u64::try_from(self.last_offset.get()).ok(),
        }
    }
}

impl fmt::Debug for SyncStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SyncStats").field(&self.snapshot()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn stats() -> SyncStats {
        let Ok(stats) = SyncStats::new() else {
            panic!("metric descriptors are valid");
        };
        stats
    }

    #[test]
    fn fresh_stats_are_zeroed() {
        let snap = stats().snapshot();
        assert!(!snap.connected);
        assert_eq!(snap.applied, 0);
        assert_eq!(snap.lost, 0);
        assert_eq!(snap.last_offset, None);
    }

    #[test]
    fn outcomes_are_counted_by_status() {
        let stats = stats();
        stats.set_connected(true);
        stats.record_applied();
        stats.record_applied();
        stats.record_rejected();
        stats.record_store_failure();
        stats.record_lost(3);
        stats.record_offset(7);

        let snap = stats.snapshot();
        assert!(snap.connected);
        assert_eq!(snap.applied, 2);
        assert_eq!(snap.rejected, 1);
        assert_eq!(snap.store_failures, 1);
        assert_eq!(snap.lost, 3);
        assert_eq!(snap.last_offset, Some(7));
    }

    #[test]
    fn registered_stats_are_exported() {
        let stats = stats();
        let registry = Registry::new();
        assert!(stats.register(&registry).is_ok());
        stats.record_applied();

        let families = registry.gather();
        let Some(events) = families
            .iter()
            .find(|family| family.get_name() == "catalog_events_consumed_total")
        else {
            panic!("events counter not exported");
        };
        assert_eq!(events.get_metric().len(), 4);
        assert!(stats.register(&registry).is_err());
    }
}
