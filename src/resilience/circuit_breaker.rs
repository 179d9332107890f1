//! Circuit breaker guarding calls to the upstream submission service.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: upstream assumed down, calls fail fast without being invoked
//! - Half-Open: upstream gets a trial call; its outcome decides the next state
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= max_failures
//! Open → Half-Open: reset_timeout elapsed since last failure (or none recorded)
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Locking
//! Admission and bookkeeping each take the state lock briefly; the protected
//! call itself runs with the lock released so a slow upstream never blocks
//! other callers' admission checks. As a consequence, several callers can be
//! admitted while the breaker is Half-Open. Setting
//! [`CircuitBreakerConfig::single_trial`] narrows that to one in-flight
//! trial.

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use utoipa::ToSchema;

/// Default number of consecutive failures that opens the circuit.
pub const DEFAULT_MAX_FAILURES: u32 = 5;
/// Default cool-down before an open circuit admits a trial call.
pub const DEFAULT_RESET_TIMEOUT: Duration = Duration::from_secs(30);
/// Default upper bound on a single protected call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected until the reset timeout elapses.
    Open,
    /// A trial call is being allowed through.
    HalfOpen,
}

impl CircuitState {
    /// Numeric gauge value (`0` closed, `1` open, `2` half-open).
    #[must_use]
    pub const fn as_gauge(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        };
        f.write_str(s)
    }
}

/// Breaker tuning, fixed at construction.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit. Values below 1 are
    /// treated as 1.
    pub max_failures: u32,
    /// How long the circuit stays open before admitting a trial call.
    pub reset_timeout: Duration,
    /// Upper bound on every admitted call; exceeding it is a failure.
    pub call_timeout: Duration,
    /// Admit at most one in-flight trial while half-open.
    pub single_trial: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            single_trial: false,
        }
    }
}

/// Outcome of a rejected or failed protected call.
#[derive(Debug, thiserror::Error)]
pub enum CallError<E> {
    /// The circuit is open; the operation was not invoked.
    #[error("circuit breaker is open")]
    Open,

    /// The operation exceeded the call timeout and was dropped.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The operation itself reported a failure.
    #[error("call failed: {0}")]
    Failed(E),
}

/// Point-in-time view of the breaker for status reporting.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CircuitSnapshot {
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures recorded since the last success.
    pub failure_count: u32,
    /// Wall-clock time of the most recent recorded failure.
    pub last_failure_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    trial_in_flight: bool,
}

/// Circuit breaker for a single downstream dependency.
///
/// Shared by reference (`Arc<CircuitBreaker>`) between the remote client
/// and the status endpoint. See the module docs for the state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker with the given configuration.
    #[must_use]
    pub fn new(mut config: CircuitBreakerConfig) -> Self {
        config.max_failures = config.max_failures.max(1);
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                last_failure_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Returns the breaker configuration.
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the current state without side effects.
    ///
    /// An open breaker whose reset timeout has elapsed still reports
    /// [`CircuitState::Open`]; the move to half-open happens on the next
    /// admitted call.
    #[must_use]
    pub fn get_state(&self) -> CircuitState {
        self.lock().state
    }

    /// Returns state, failure count and last failure time together.
    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            last_failure_at: inner.last_failure_at,
        }
    }

    /// Runs `operation` under breaker protection.
    ///
    /// The operation is only invoked if the breaker admits the call. An
    /// `Err` from the operation, or running past `call_timeout`, is recorded
    /// as a failure; an `Ok` is recorded as a success. Callers decide what
    /// counts as failure by choosing what to return as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Open`] if the call was rejected,
    /// [`CallError::Timeout`] if it exceeded the call timeout, and
    /// [`CallError::Failed`] with the operation's own error otherwise.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let Some(trial) = self.admit() else {
            return Err(CallError::Open);
        };

        match tokio::time::timeout(self.config.call_timeout, operation()).await {
            Ok(Ok(value)) => {
                self.record_success(trial);
                Ok(value)
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "protected call failed");
                self.record_failure(trial);
                Err(CallError::Failed(err))
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.call_timeout.as_millis(),
                    "protected call timed out"
                );
                self.record_failure(trial);
                Err(CallError::Timeout(self.config.call_timeout))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock is still safe to use.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admission check. `None` means reject.
    fn admit(&self) -> Option<TrialGuard<'_>> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Some(TrialGuard::idle(self)),
            CircuitState::Open => {
                let eligible = inner
                    .last_failure
                    .is_none_or(|at| at.elapsed() >= self.config.reset_timeout);
                if !eligible {
                    return None;
                }
                inner.state = CircuitState::HalfOpen;
                tracing::info!("circuit breaker transitioning to HALF_OPEN");
                Some(self.begin_trial(&mut inner))
            }
            CircuitState::HalfOpen => {
                if self.config.single_trial && inner.trial_in_flight {
                    return None;
                }
                Some(self.begin_trial(&mut inner))
            }
        }
    }

    fn begin_trial(&self, inner: &mut BreakerInner) -> TrialGuard<'_> {
        if self.config.single_trial {
            inner.trial_in_flight = true;
            TrialGuard::armed(self)
        } else {
            TrialGuard::idle(self)
        }
    }

    fn record_success(&self, trial: TrialGuard<'_>) {
        let mut inner = self.lock();
        trial.release(&mut inner);
        inner.failure_count = 0;
        inner.last_failure = None;
        inner.last_failure_at = None;
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            tracing::info!("circuit breaker transitioning to CLOSED (trial call succeeded)");
        }
    }

    fn record_failure(&self, trial: TrialGuard<'_>) {
        let mut inner = self.lock();
        trial.release(&mut inner);
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());
        inner.last_failure_at = Some(Utc::now());
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                tracing::warn!("circuit breaker transitioning to OPEN (trial call failed)");
            }
            CircuitState::Closed if inner.failure_count >= self.config.max_failures => {
                inner.state = CircuitState::Open;
                tracing::warn!(
                    failures = inner.failure_count,
                    "circuit breaker transitioning to OPEN"
                );
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
    }
}

/// Marks an in-flight half-open trial when `single_trial` is enabled.
///
/// Released under the state lock when the call completes; if the call
/// future is dropped first, `Drop` releases it instead so the next caller
/// can become the trial.
struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl<'a> TrialGuard<'a> {
    const fn idle(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            armed: false,
        }
    }

    const fn armed(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            armed: true,
        }
    }

    fn release(mut self, inner: &mut BreakerInner) {
        if self.armed {
            inner.trial_in_flight = false;
            self.armed = false;
        }
    }
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.lock().trial_in_flight = false;
        }
    }
}
