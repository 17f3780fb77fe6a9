//! Circuit breaker for endpoint protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: endpoint assumed down, calls fail fast
//! - Half-Open: a bounded number of trial calls probe recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: window holds >= minimum calls and failure rate >= threshold
//! Open → Half-Open: after wait_duration_in_open (checked on next permission request)
//! Half-Open → Closed: trial calls complete with failure rate < threshold
//! Half-Open → Open: trial calls complete with failure rate >= threshold
//! ```
//!
//! # Design Decisions
//! - One breaker per endpoint, owned by that endpoint (no registry)
//! - Count-based sliding window of the most recent outcomes
//! - The window lock is held only to grant a permit or record an outcome,
//!   never across the guarded call
//! - Every transition clears the window

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;
use crate::resilience::clock::{Clock, SystemClock};

/// Breaker state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(val: u8) -> Self {
        match val {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker tuning. Used as a template: every endpoint gets its own breaker
/// built from a clone of this.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Fraction of failed calls in the window that trips the breaker.
    pub failure_rate_threshold: f64,
    /// Number of most recent calls kept in the closed-state window.
    pub sliding_window_size: usize,
    /// Calls required in the window before the failure rate is evaluated.
    /// `None` means the window must be full.
    pub minimum_number_of_calls: Option<usize>,
    /// How long the breaker stays open before allowing trial calls.
    pub wait_duration_in_open: Duration,
    /// Trial calls allowed (and evaluated) in the half-open state.
    pub permitted_calls_in_half_open: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_size: 100,
            minimum_number_of_calls: None,
            wait_duration_in_open: Duration::from_secs(10),
            permitted_calls_in_half_open: 10,
        }
    }
}

/// Rejected breaker configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid circuit breaker configuration: {0}")]
pub struct InvalidBreakerConfig(pub String);

impl CircuitBreakerConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<(), InvalidBreakerConfig> {
        if !(self.failure_rate_threshold > 0.0 && self.failure_rate_threshold <= 1.0) {
            return Err(InvalidBreakerConfig(format!(
                "failure_rate_threshold must be in (0, 1], got {}",
                self.failure_rate_threshold
            )));
        }
        if self.sliding_window_size == 0 {
            return Err(InvalidBreakerConfig("sliding_window_size must be > 0".into()));
        }
        if let Some(min) = self.minimum_number_of_calls {
            if min == 0 || min > self.sliding_window_size {
                return Err(InvalidBreakerConfig(format!(
                    "minimum_number_of_calls must be in 1..={}, got {}",
                    self.sliding_window_size, min
                )));
            }
        }
        if self.wait_duration_in_open.is_zero() {
            return Err(InvalidBreakerConfig("wait_duration_in_open must be > 0".into()));
        }
        if self.permitted_calls_in_half_open == 0 {
            return Err(InvalidBreakerConfig(
                "permitted_calls_in_half_open must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn minimum_calls(&self) -> usize {
        self.minimum_number_of_calls.unwrap_or(self.sliding_window_size)
    }
}

/// Outcome of a guarded call.
#[derive(Debug)]
pub enum CallError<E> {
    /// The breaker did not permit the call; it was never made.
    Rejected,
    /// The call was made and failed.
    Failed(E),
}

/// Point-in-time view of a breaker, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerMetrics {
    pub state: CircuitState,
    /// Failure rate over the current window, once enough calls are buffered.
    pub failure_rate: Option<f64>,
    pub buffered_calls: usize,
    pub buffered_failures: usize,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub not_permitted_calls: u64,
}

/// Sliding window and transition bookkeeping. Guarded by the breaker mutex.
#[derive(Debug, Default)]
struct Window {
    /// `true` marks a failed call.
    outcomes: VecDeque<bool>,
    failures: usize,
    opened_at: Option<Instant>,
    half_open_permits: usize,
    /// Bumped on every transition; permits from older generations are stale.
    generation: u64,
}

impl Window {
    fn push(&mut self, failed: bool, capacity: usize) {
        if self.outcomes.len() == capacity {
            if let Some(true) = self.outcomes.pop_front() {
                self.failures -= 1;
            }
        }
        self.outcomes.push_back(failed);
        if failed {
            self.failures += 1;
        }
    }

    fn failure_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.failures as f64 / self.outcomes.len() as f64
    }

    fn reset(&mut self) {
        self.outcomes.clear();
        self.failures = 0;
        self.half_open_permits = 0;
    }
}

/// Permission to make one call, tied to the breaker state it was granted in.
///
/// Outcomes reported with a permit from before the latest transition still
/// count in the totals but never enter the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    generation: u64,
}

/// Records a failure if the guarded call unwinds before reporting.
struct PermitGuard<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<Permit>,
}

impl PermitGuard<'_> {
    fn complete(mut self, failed: bool) {
        if let Some(permit) = self.permit.take() {
            if failed {
                self.breaker.on_error(permit);
            } else {
                self.breaker.on_success(permit);
            }
        }
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            tracing::error!(breaker = %self.breaker.name, "Guarded call panicked, recording failure");
            self.breaker.on_error(permit);
        }
    }
}

/// A circuit breaker guarding a single endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    /// Mirror of the current state for lock-free reads.
    state: AtomicU8,
    window: Mutex<Window>,
    successful_calls: AtomicU64,
    failed_calls: AtomicU64,
    not_permitted_calls: AtomicU64,
}

impl CircuitBreaker {
    /// Create a closed breaker using the wall clock.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Result<Self, InvalidBreakerConfig> {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create a closed breaker with an explicit time source.
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, InvalidBreakerConfig> {
        config.validate()?;
        let name = name.into();
        metrics::record_breaker_state(&name, CircuitState::Closed);

        Ok(Self {
            name,
            config,
            clock,
            state: AtomicU8::new(CircuitState::Closed as u8),
            window: Mutex::new(Window::default()),
            successful_calls: AtomicU64::new(0),
            failed_calls: AtomicU64::new(0),
            not_permitted_calls: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state.
    ///
    /// An open breaker whose wait has elapsed still reports `Open` until the
    /// next permission request moves it to half-open.
    pub fn state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    /// Run `f` if the breaker permits it and record the outcome.
    ///
    /// A panic in `f` is recorded as a failure before it propagates.
    pub fn call<R, E, F>(&self, f: F) -> Result<R, CallError<E>>
    where
        F: FnOnce() -> Result<R, E>,
    {
        let Some(permit) = self.try_acquire_permission() else {
            return Err(CallError::Rejected);
        };
        let guard = PermitGuard {
            breaker: self,
            permit: Some(permit),
        };

        match f() {
            Ok(value) => {
                guard.complete(false);
                Ok(value)
            }
            Err(e) => {
                guard.complete(true);
                Err(CallError::Failed(e))
            }
        }
    }

    /// Ask for permission to make one call.
    ///
    /// A refusal is counted as a not-permitted call. Every granted permit
    /// must be handed back through `on_success` or `on_error`.
    pub fn try_acquire_permission(&self) -> Option<Permit> {
        let mut window = self.lock_window();

        let permitted = match self.state() {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = window
                    .opened_at
                    .map(|at| self.clock.now().saturating_duration_since(at))
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.wait_duration_in_open {
                    self.transition(&mut window, CircuitState::HalfOpen);
                    window.half_open_permits = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if window.half_open_permits < self.config.permitted_calls_in_half_open {
                    window.half_open_permits += 1;
                    true
                } else {
                    false
                }
            }
        };

        if !permitted {
            self.not_permitted_calls.fetch_add(1, Ordering::Relaxed);
            metrics::record_endpoint_call(&self.name, "rejected");
            return None;
        }
        Some(Permit {
            generation: window.generation,
        })
    }

    /// Record a successful permitted call.
    pub fn on_success(&self, permit: Permit) {
        self.successful_calls.fetch_add(1, Ordering::Relaxed);
        metrics::record_endpoint_call(&self.name, "success");
        self.record(permit, false);
    }

    /// Record a failed permitted call.
    pub fn on_error(&self, permit: Permit) {
        self.failed_calls.fetch_add(1, Ordering::Relaxed);
        metrics::record_endpoint_call(&self.name, "failure");
        self.record(permit, true);
    }

    /// Snapshot of counters and window contents.
    pub fn metrics(&self) -> BreakerMetrics {
        let window = self.lock_window();
        let state = self.state();
        let required = match state {
            CircuitState::HalfOpen => self.config.permitted_calls_in_half_open,
            _ => self.config.minimum_calls(),
        };
        let failure_rate = if window.outcomes.len() >= required {
            Some(window.failure_rate())
        } else {
            None
        };

        BreakerMetrics {
            state,
            failure_rate,
            buffered_calls: window.outcomes.len(),
            buffered_failures: window.failures,
            successful_calls: self.successful_calls.load(Ordering::Relaxed),
            failed_calls: self.failed_calls.load(Ordering::Relaxed),
            not_permitted_calls: self.not_permitted_calls.load(Ordering::Relaxed),
        }
    }

    fn record(&self, permit: Permit, failed: bool) {
        let mut window = self.lock_window();

        if permit.generation != window.generation {
            tracing::trace!(breaker = %self.name, failed, "Dropping outcome of a call permitted before the last transition");
            return;
        }

        match self.state() {
            CircuitState::Closed => {
                window.push(failed, self.config.sliding_window_size);
                if window.outcomes.len() >= self.config.minimum_calls()
                    && window.failure_rate() >= self.config.failure_rate_threshold
                {
                    self.transition(&mut window, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                window.push(failed, self.config.permitted_calls_in_half_open);
                if window.outcomes.len() >= self.config.permitted_calls_in_half_open {
                    if window.failure_rate() >= self.config.failure_rate_threshold {
                        self.transition(&mut window, CircuitState::Open);
                    } else {
                        self.transition(&mut window, CircuitState::Closed);
                    }
                }
            }
            // Open grants no permits, so a current-generation outcome cannot land here.
            CircuitState::Open => {}
        }
    }

    fn transition(&self, window: &mut Window, to: CircuitState) {
        let from = self.state();
        let failure_rate = window.failure_rate();

        window.reset();
        window.generation += 1;
        window.opened_at = match to {
            CircuitState::Open => Some(self.clock.now()),
            _ => None,
        };
        self.state.store(to as u8, Ordering::Release);
        metrics::record_breaker_state(&self.name, to);

        match to {
            CircuitState::Open => tracing::warn!(
                breaker = %self.name,
                from = %from,
                failure_rate,
                wait_ms = self.config.wait_duration_in_open.as_millis() as u64,
                "Circuit breaker opened"
            ),
            _ => tracing::info!(breaker = %self.name, from = %from, to = %to, "Circuit breaker transition"),
        }
    }

    fn lock_window(&self) -> MutexGuard<'_, Window> {
        self.window.lock().expect("circuit breaker mutex poisoned")
    }
}
