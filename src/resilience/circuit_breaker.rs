//! Circuit breaker for downstream target protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: target assumed down, requests fail fast
//! - Half-Open: probing whether the target recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: reset_timeout elapsed (checked lazily in is_allowed)
//! Half-Open → Closed: success_count >= half_open_success_needed
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One breaker per target, shared by every in-flight request through an `Arc`
//! - All transitions happen under a single mutex; no background timer
//! - Half-Open admits at most `half_open_success_needed` probes at a time;
//!   further callers are rejected until a probe reports back
//! - State change events are emitted after the lock is released

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::resilience::events::{NoopListener, ResilienceEvent, ResilienceListener};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used for gauges (0=closed, 1=open, 2=half-open).
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// How a request got past the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The circuit is closed.
    Normal,
    /// The request holds one of the half-open probe slots.
    Probe,
}

/// Point-in-time view of a breaker, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub enabled: bool,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Milliseconds since the circuit last opened, if it has ever opened.
    pub open_for_ms: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    probes_in_flight: u32,
    opened_at: Option<Instant>,
}

type Transition = (CircuitState, CircuitState);

impl Inner {
    fn transition_to(&mut self, next: CircuitState) -> Transition {
        let prev = self.state;
        self.state = next;
        self.probes_in_flight = 0;
        match next {
            CircuitState::Closed => {
                self.failure_count = 0;
                self.success_count = 0;
            }
            CircuitState::Open => {
                self.opened_at = Some(Instant::now());
                self.success_count = 0;
            }
            CircuitState::HalfOpen => {
                self.success_count = 0;
            }
        }
        (prev, next)
    }
}

/// Circuit breaker shared by all requests to one target.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    listener: Arc<dyn ResilienceListener>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                probes_in_flight: 0,
                opened_at: None,
            }),
            listener: Arc::new(NoopListener),
        }
    }

    /// Report state changes to `listener`.
    pub fn with_listener(mut self, listener: Arc<dyn ResilienceListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns true if a new request may be sent now.
    ///
    /// An open circuit whose reset timeout has elapsed moves to half-open here
    /// and the call that performs the move is allowed through as a probe. An
    /// admitted probe must be followed by `on_success`, `on_failure` or
    /// [`release_probe`](Self::release_probe).
    pub fn is_allowed(&self) -> bool {
        self.try_admit().is_some()
    }

    /// Like [`is_allowed`](Self::is_allowed), but reports whether the caller
    /// took a half-open probe slot.
    pub fn try_admit(&self) -> Option<Admission> {
        if !self.config.enabled {
            return Some(Admission::Normal);
        }

        let (admission, transition) = {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => (Some(Admission::Normal), None),
                CircuitState::HalfOpen => (self.admit_probe(&mut inner), None),
                CircuitState::Open => {
                    let elapsed = inner
                        .opened_at
                        .map(|at| at.elapsed())
                        .unwrap_or_default();
                    if elapsed >= self.config.reset_timeout() {
                        let transition = inner.transition_to(CircuitState::HalfOpen);
                        (self.admit_probe(&mut inner), Some(transition))
                    } else {
                        (None, None)
                    }
                }
            }
        };

        self.notify(transition);
        admission
    }

    /// Give back a probe slot for a request that was admitted but ended
    /// without an outcome (cancelled or never sent).
    pub fn release_probe(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
        }
    }

    fn probe_limit(&self) -> u32 {
        self.config.half_open_success_needed.max(1)
    }

    fn admit_probe(&self, inner: &mut Inner) -> Option<Admission> {
        if inner.probes_in_flight < self.probe_limit() {
            inner.probes_in_flight += 1;
            Some(Admission::Probe)
        } else {
            None
        }
    }

    /// Record a successful outcome.
    pub fn on_success(&self) {
        if !self.config.enabled {
            return;
        }

        let transition = {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => {
                    inner.failure_count = 0;
                    None
                }
                CircuitState::HalfOpen => {
                    inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
                    inner.success_count = inner.success_count.saturating_add(1);
                    if inner.success_count >= self.config.half_open_success_needed {
                        Some(inner.transition_to(CircuitState::Closed))
                    } else {
                        None
                    }
                }
                // A request admitted before the circuit opened finished late.
                CircuitState::Open => None,
            }
        };

        self.notify(transition);
    }

    /// Record a failed outcome.
    pub fn on_failure(&self) {
        if !self.config.enabled {
            return;
        }

        let transition = {
            let mut inner = self.lock();
            match inner.state {
                CircuitState::Closed => {
                    inner.failure_count = inner.failure_count.saturating_add(1);
                    if inner.failure_count >= self.config.failure_threshold {
                        Some(inner.transition_to(CircuitState::Open))
                    } else {
                        None
                    }
                }
                CircuitState::HalfOpen => Some(inner.transition_to(CircuitState::Open)),
                CircuitState::Open => None,
            }
        };

        self.notify(transition);
    }

    /// Current state without applying the lazy open → half-open check.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn success_count(&self) -> u32 {
        self.lock().success_count
    }

    /// Half-open probes admitted and not yet reported back.
    pub fn probes_in_flight(&self) -> u32 {
        self.lock().probes_in_flight
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            enabled: self.config.enabled,
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            open_for_ms: inner
                .opened_at
                .map(|at| at.elapsed().as_millis().min(u64::MAX as u128) as u64),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters stay consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, transition: Option<Transition>) {
        if let Some((from, to)) = transition {
            tracing::debug!(?from, ?to, "Circuit state changed");
            self.listener
                .on_event(&ResilienceEvent::StateChanged { from, to });
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("inner", &*self.lock())
            .finish()
    }
}
