//! Upstream access: the submission service and its circuit-protected client.
//!
//! [`UpstreamSource`] performs one raw lookup and classifies the response
//! into a [`FetchOutcome`]. [`ProtectedRemoteClient`] runs that lookup
//! through the shared [`crate::resilience::CircuitBreaker`], counting only
//! [`FetchOutcome::Failure`] against it.

pub mod protected;
pub mod submission_client;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{CatalogEntry, EntryId};

pub use protected::{ProtectedRemoteClient, RemoteLookup};
pub use submission_client::HttpSubmissionSource;

/// Why an upstream lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamFailure {
    /// The upstream answered with a non-success status other than 404.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Connection, TLS or request timeout failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// The upstream answered 2xx with a body that is not a valid item.
    #[error("undecodable upstream payload: {0}")]
    Decode(String),
}

/// Classified result of a single upstream lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The upstream returned the item.
    Found(CatalogEntry),
    /// The upstream is healthy and reports the item does not exist.
    Absent,
    /// The upstream could not answer.
    Failure(UpstreamFailure),
}

/// A single upstream endpoint able to look items up by id.
#[async_trait]
pub trait UpstreamSource: Send + Sync + fmt::Debug {
    /// Performs one lookup and classifies the response.
    async fn fetch(&self, id: EntryId) -> FetchOutcome;
}
