//! In-process event stream backed by a retained, bounded log per topic.
//!
//! [`InMemoryEventStream`] keeps every record of a topic that has not been
//! committed yet. All subscriptions on a topic share one committed offset,
//! like members of a single consumer group: a new subscription starts right
//! after the last committed record, so anything received but not committed
//! is delivered again. When a topic holds `capacity` uncommitted records,
//! [`InMemoryEventStream::publish`] waits for a commit instead of dropping.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio_util::sync::CancellationToken;

use super::stream::{EventStream, StreamError, StreamRecord, Subscription};

#[derive(Debug, Default)]
struct TopicLog {
    /// Uncommitted records, oldest first.
    pending: VecDeque<StreamRecord>,
    next_offset: u64,
    committed: Option<u64>,
}

impl TopicLog {
    fn first_uncommitted(&self) -> u64 {
        self.committed.map_or(0, |c| c.saturating_add(1))
    }

    fn get(&self, offset: u64) -> Option<&StreamRecord> {
        let index = offset.checked_sub(self.first_uncommitted())?;
        self.pending.get(usize::try_from(index).ok()?)
    }
}

#[derive(Debug, Default)]
struct Topic {
    log: Mutex<TopicLog>,
    appended: Notify,
    drained: Notify,
}

#[derive(Debug)]
struct Shared {
    capacity: usize,
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    closed: CancellationToken,
}

/// Log-backed [`EventStream`] that also accepts publishes.
///
/// Cheap to clone; clones share the same topics.
#[derive(Debug, Clone)]
pub struct InMemoryEventStream {
    shared: Arc<Shared>,
}

impl InMemoryEventStream {
    /// Creates a stream whose topics retain up to `capacity` uncommitted
    /// records each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                capacity: capacity.max(1),
                topics: RwLock::new(HashMap::new()),
                closed: CancellationToken::new(),
            }),
        }
    }

    /// Appends `payload` to `topic` and returns its assigned offset.
    ///
    /// Waits while the topic is full. Dropping the returned future before
    /// it completes publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Unavailable`] once the stream is shut down,
    /// including while waiting for room.
    pub async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<u64, StreamError> {
        self.ensure_running()?;
        let topic_log = self.topic(topic).await;

        let mut log = loop {
            let log = topic_log.log.lock().await;
            if log.pending.len() < self.shared.capacity {
                break log;
            }
            let room = topic_log.drained.notified();
            drop(log);
            tracing::debug!(topic, capacity = self.shared.capacity, "topic full, waiting for commit");
            tokio::select! {
                () = room => {}
                () = self.shared.closed.cancelled() => {}
            }
            self.ensure_running()?;
        };

        let offset = log.next_offset;
        log.next_offset = offset.saturating_add(1);
        log.pending.push_back(StreamRecord {
            topic: topic.to_string(),
            offset,
            payload,
        });
        drop(log);
        topic_log.appended.notify_waiters();
        Ok(offset)
    }

    /// Stops accepting publishes and subscriptions. Open subscriptions end
    /// once they have read every retained record.
    pub fn shutdown(&self) {
        self.shared.closed.cancel();
    }

    async fn topic(&self, name: &str) -> Arc<Topic> {
        if let Some(topic) = self.shared.topics.read().await.get(name) {
            return Arc::clone(topic);
        }
        let mut topics = self.shared.topics.write().await;
        Arc::clone(topics.entry(name.to_string()).or_default())
    }

    fn ensure_running(&self) -> Result<(), StreamError> {
        if self.shared.closed.is_cancelled() {
            return Err(StreamError::Unavailable("stream shut down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStream for InMemoryEventStream {
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn Subscription>, StreamError> {
        self.ensure_running()?;
        let log = self.topic(topic).await;
        let position = log.log.lock().await.first_uncommitted();
        Ok(Box::new(InMemorySubscription {
            topic: topic.to_string(),
            log,
            closed: self.shared.closed.clone(),
            position,
            open: true,
        }))
    }
}

/// Subscription handed out by [`InMemoryEventStream`].
#[derive(Debug)]
struct InMemorySubscription {
    topic: String,
    log: Arc<Topic>,
    closed: CancellationToken,
    /// Offset of the next record to deliver.
    position: u64,
    open: bool,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn receive(&mut self) -> Result<Option<StreamRecord>, StreamError> {
        if !self.open {
            return Err(StreamError::Closed);
        }
        loop {
            let appended = {
                let log = self.log.log.lock().await;
                self.position = self.position.max(log.first_uncommitted());
                if let Some(record) = log.get(self.position) {
                    let record = record.clone();
                    self.position = self.position.saturating_add(1);
                    return Ok(Some(record));
                }
                if self.closed.is_cancelled() {
                    return Ok(None);
                }
                self.log.appended.notified()
            };
            tokio::select! {
                () = appended => {}
                () = self.closed.cancelled() => {}
            }
        }
    }

    async fn commit(&mut self, record: &StreamRecord) -> Result<(), StreamError> {
        if !self.open {
            return Err(StreamError::Closed);
        }
        let mut log = self.log.log.lock().await;
        if record.offset >= log.next_offset || log.committed.is_some_and(|c| c >= record.offset) {
            return Ok(());
        }
        log.committed = Some(record.offset);
        while log.pending.front().is_some_and(|r| r.offset <= record.offset) {
            log.pending.pop_front();
        }
        drop(log);
        self.log.drained.notify_waiters();
        Ok(())
    }

    async fn close(&mut self) {
        if std::mem::replace(&mut self.open, false) {
            tracing::debug!(topic = %self.topic, position = self.position, "subscription closed");
        }
    }
}
