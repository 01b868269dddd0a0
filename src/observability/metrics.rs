//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resilience_attempts_total` (counter): attempts by outcome (success, server_error, transport_error)
//! - `resilience_retries_total` (counter): scheduled retries
//! - `resilience_backoff_seconds` (histogram): scheduled backoff delays
//! - `resilience_rejected_total` (counter): requests refused by an open circuit
//! - `resilience_cancelled_total` (counter): requests cancelled during backoff, by cause
//! - `resilience_exhausted_total` (counter): requests that used every attempt
//! - `resilience_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `resilience_circuit_transitions_total` (counter): state changes by target state

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::events::{ResilienceEvent, ResilienceListener};
use crate::resilience::types::CancelCause;

/// Install the Prometheus exporter with an HTTP scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Records resilience events into the global `metrics` recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsListener;

fn state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half_open",
    }
}

impl ResilienceListener for MetricsListener {
    fn on_event(&self, event: &ResilienceEvent) {
        match event {
            ResilienceEvent::StateChanged { to, .. } => {
                gauge!("resilience_circuit_state").set(to.as_gauge());
                counter!("resilience_circuit_transitions_total", "to" => state_label(*to))
                    .increment(1);
            }
            ResilienceEvent::Rejected => {
                counter!("resilience_rejected_total").increment(1);
            }
            ResilienceEvent::AttemptSucceeded { .. } => {
                counter!("resilience_attempts_total", "outcome" => "success").increment(1);
            }
            ResilienceEvent::AttemptFailed { status, .. } => {
                let outcome = if status.is_some() { "server_error" } else { "transport_error" };
                counter!("resilience_attempts_total", "outcome" => outcome).increment(1);
            }
            ResilienceEvent::RetryScheduled { delay, .. } => {
                counter!("resilience_retries_total").increment(1);
                histogram!("resilience_backoff_seconds").record(delay.as_secs_f64());
            }
            ResilienceEvent::Cancelled { cause, .. } => {
                let cause = match cause {
                    CancelCause::Cancelled => "cancelled",
                    CancelCause::DeadlineExceeded => "deadline_exceeded",
                };
                counter!("resilience_cancelled_total", "cause" => cause).increment(1);
            }
            ResilienceEvent::Exhausted { .. } => {
                counter!("resilience_exhausted_total").increment(1);
            }
        }
    }
}
