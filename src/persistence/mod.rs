//! Persistence layer: the materialized catalog store.
//!
//! Provides the [`CatalogStore`] trait for the local read/write interface.
//! The production implementation uses `sqlx::PgPool`; an in-memory store
//! backs tests and persistence-disabled deployments.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;
pub use store::CatalogStore;
