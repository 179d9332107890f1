//! Event-driven synchronization of the local catalog store.
//!
//! [`EventSyncPipeline::run`] subscribes to the item event topic (retrying
//! forever on failure), then applies every received event as an idempotent
//! upsert, in delivery order. A bad event or a failed write is logged and
//! counted; consumption continues with the next record. Records are
//! committed only after their apply attempt, so redelivery after a crash is
//! possible and harmless.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::SyncStats;
use super::stream::{EventStream, StreamError, StreamRecord, Subscription};
use crate::domain::{EntryId, EventError, ItemEvent};
use crate::error::CatalogError;
use crate::persistence::CatalogStore;

/// Default pause between subscription attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Why a single record was not applied.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The payload is not a valid item event.
    #[error(transparent)]
    Rejected(#[from] EventError),

    /// The store refused the write.
    #[error(transparent)]
    Store(#[from] CatalogError),
}

/// Long-running consumer keeping the local store in sync with the stream.
#[derive(Debug)]
pub struct EventSyncPipeline {
    stream: Arc<dyn EventStream>,
    store: Arc<dyn CatalogStore>,
    topic: String,
    retry_interval: Duration,
    stats: Arc<SyncStats>,
}

impl EventSyncPipeline {
    /// Creates a pipeline reading `topic` from `stream` into `store`,
    /// reporting progress into `stats`.
    #[must_use]
    pub fn new(
        stream: Arc<dyn EventStream>,
        store: Arc<dyn CatalogStore>,
        topic: impl Into<String>,
        stats: Arc<SyncStats>,
    ) -> Self {
        Self {
            stream,
            store,
            topic: topic.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            stats,
        }
    }

    /// Overrides the pause between subscription attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Returns the pipeline's counters.
    #[must_use]
    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    /// Runs until `shutdown` is cancelled or the stream ends.
    ///
    /// Cancellation is observed while connecting, while waiting to retry,
    /// and while waiting for the next record. A record already received is
    /// applied and committed before cancellation is checked again, so an
    /// upsert is never interrupted halfway. The subscription is closed on
    /// every exit path.
    pub async fn run(self, shutdown: CancellationToken) {
        let Some(mut subscription) = self.connect(&shutdown).await else {
            tracing::info!(topic = %self.topic, "sync pipeline cancelled before subscribing");
            return;
        };
        self.stats.set_connected(true);
        tracing::info!(topic = %self.topic, "sync pipeline subscribed");

        self.consume(subscription.as_mut(), &shutdown).await;

        subscription.close().await;
        self.stats.set_connected(false);
        tracing::info!(topic = %self.topic, "sync pipeline stopped");
    }

    async fn connect(&self, shutdown: &CancellationToken) -> Option<Box<dyn Subscription>> {
        loop {
            let attempt = tokio::select! {
                () = shutdown.cancelled() => return None,
                attempt = self.stream.subscribe(&self.topic) => attempt,
            };
            match attempt {
                Ok(subscription) => return Some(subscription),
                Err(err) => {
                    tracing::warn!(
                        topic = %self.topic,
                        error = %err,
                        retry_in_secs = self.retry_interval.as_secs_f64(),
                        "event stream not ready, retrying"
                    );
                }
            }
            tokio::select! {
                () = shutdown.cancelled() => return None,
                () = tokio::time::sleep(self.retry_interval) => {}
            }
        }
    }

    async fn consume(&self, subscription: &mut dyn Subscription, shutdown: &CancellationToken) {
        loop {
            let received = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    tracing::info!(topic = %self.topic, "sync pipeline cancelled");
                    return;
                }
                received = subscription.receive() => received,
            };

            let record = match received {
                Ok(Some(record)) => record,
                Ok(None) => {
                    tracing::info!(topic = %self.topic, "event stream ended");
                    return;
                }
                Err(StreamError::Lagged(skipped)) => {
                    self.stats.record_lost(skipped);
                    tracing::error!(topic = %self.topic, skipped, "sync pipeline lagged, events lost");
                    continue;
                }
                Err(err) => {
                    tracing::error!(topic = %self.topic, error = %err, "event stream failed");
                    return;
                }
            };

            self.handle(&record).await;
            if let Err(err) = subscription.commit(&record).await {
                tracing::warn!(offset = record.offset, error = %err, "commit failed");
            }
            self.stats.record_offset(record.offset);
        }
    }

    /// Applies one record, logging and counting the outcome.
    async fn handle(&self, record: &StreamRecord) {
        match self.apply(record).await {
            Ok(id) => {
                self.stats.record_applied();
                tracing::info!(%id, offset = record.offset, "synced entry to catalog store");
            }
            Err(ApplyError::Rejected(err)) => {
                self.stats.record_rejected();
                tracing::error!(offset = record.offset, error = %err, "rejected malformed event");
            }
            Err(ApplyError::Store(err)) => {
                self.stats.record_store_failure();
                tracing::error!(offset = record.offset, error = %err, "failed to upsert entry");
            }
        }
    }

    /// Parses `record` and upserts the resulting entry.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError::Rejected`] for malformed events and
    /// [`ApplyError::Store`] if the upsert fails.
    pub async fn apply(&self, record: &StreamRecord) -> Result<EntryId, ApplyError> {
        let entry = ItemEvent::from_payload(&record.payload)?.into_entry(Utc::now())?;
        self.store.upsert(&entry).await?;
        Ok(entry.id)
    }
}
