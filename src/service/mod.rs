//! Service layer: read-path orchestration.
//!
//! [`CatalogReadPath`] resolves entries from the local store and falls
//! back to the circuit-protected upstream client on a miss.

pub mod catalog_service;

pub use catalog_service::CatalogReadPath;
