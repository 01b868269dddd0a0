//! Resilience events and the listener hook.
//!
//! The core never logs or records metrics itself. It reports what happened
//! through [`ResilienceListener`]; `observability` provides listeners that
//! turn events into log lines and metrics.

use std::sync::Arc;
use std::time::Duration;

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::types::CancelCause;

/// Something observable that happened inside the resilience layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ResilienceEvent {
    /// The circuit breaker moved between states.
    StateChanged { from: CircuitState, to: CircuitState },

    /// A request was refused because the circuit is open.
    Rejected,

    /// An attempt ended in success (status below the server error threshold).
    AttemptSucceeded { attempt: u32, status: u16 },

    /// An attempt failed. `status` is `None` for transport-level errors.
    AttemptFailed {
        attempt: u32,
        status: Option<u16>,
        error: Option<String>,
    },

    /// A retry was scheduled after the given delay.
    RetryScheduled { attempt: u32, delay: Duration },

    /// The caller's cancellation signal won over a pending backoff wait.
    Cancelled { attempt: u32, cause: CancelCause },

    /// Every attempt was used up without a success.
    Exhausted { attempts: u32 },
}

/// Receives [`ResilienceEvent`]s. Implementations must be cheap and non-blocking.
pub trait ResilienceListener: Send + Sync {
    fn on_event(&self, event: &ResilienceEvent);
}

/// Listener that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ResilienceListener for NoopListener {
    fn on_event(&self, _event: &ResilienceEvent) {}
}

/// Fans each event out to several listeners in order.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Vec<Arc<dyn ResilienceListener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, listener: Arc<dyn ResilienceListener>) -> Self {
        self.inner.push(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ResilienceListener for Listeners {
    fn on_event(&self, event: &ResilienceEvent) {
        for listener in &self.inner {
            listener.on_event(event);
        }
    }
}
