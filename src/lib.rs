//! # catalog-cache
//!
//! Read-through catalog cache in front of the submission service.
//!
//! Catalog lookups are served from a local store first. On a miss the
//! entry is fetched from the submission service through a circuit breaker,
//! so a failing upstream degrades lookups to "not found" instead of
//! stalling them. The local store is kept current by a background pipeline
//! applying item creation/update events as idempotent upserts.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── CatalogReadPath (service/)
//!     │       ├── CatalogStore (persistence/) ◄── EventSyncPipeline (sync/)
//!     │       │                                        ▲
//!     │       └── ProtectedRemoteClient (upstream/)    │
//!     │               └── CircuitBreaker (resilience/) │
//!     │                                                │
//!     ├── POST /internal/events ──► EventStream ───────┘
//!     │
//!     └── GET /metrics ◄── CatalogMetrics (metrics/) ◄── SyncStats
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod resilience;
pub mod service;
pub mod sync;
pub mod upstream;
