//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the upstream service:
//!     → circuit_breaker.rs (admission check, call_timeout, failure bookkeeping)
//!     → upstream::ProtectedRemoteClient (classifies absent vs failure)
//! ```
//!
//! There is no retry layer: a failed remote lookup degrades to "no remote
//! data" and the caller moves on.

pub mod circuit_breaker;

pub use circuit_breaker::{
    CallError, CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState,
};
