//! Event stream seam consumed by the sync pipeline.

use std::fmt;

use async_trait::async_trait;

/// One delivered stream message.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    /// Topic the record was published to.
    pub topic: String,
    /// Position of the record within its topic, assigned on publish.
    pub offset: u64,
    /// Opaque event payload.
    pub payload: serde_json::Value,
}

/// Event stream failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// The stream cannot be reached (startup-time failure).
    #[error("event stream unavailable: {0}")]
    Unavailable(String),

    /// The subscriber fell behind and `0` records were skipped.
    #[error("subscriber lagged, {0} records skipped")]
    Lagged(u64),

    /// The subscription was already closed.
    #[error("subscription closed")]
    Closed,
}

/// An ordered, topic-addressed event stream.
#[async_trait]
pub trait EventStream: Send + Sync + fmt::Debug {
    /// Opens a subscription to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Unavailable`] if the stream cannot be reached.
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, StreamError>;
}

/// A live subscription delivering records in publish order.
#[async_trait]
pub trait Subscription: Send + fmt::Debug {
    /// Waits for the next record. `Ok(None)` signals end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Lagged`] when records were dropped before
    /// delivery, and [`StreamError::Closed`] after [`Subscription::close`].
    async fn receive(&mut self) -> Result<Option<StreamRecord>, StreamError>;

    /// Acknowledges everything up to and including `record`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Closed`] after [`Subscription::close`].
    async fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError>;

    /// Releases the subscription. Idempotent.
    async fn close(&mut self);
}
