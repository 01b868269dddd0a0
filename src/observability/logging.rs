//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Turn resilience events into structured log lines
//!
//! # Design Decisions
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;
use crate::resilience::circuit_breaker::CircuitState;
use crate::resilience::events::{ResilienceEvent, ResilienceListener};

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "resilient_transport={level},{level}",
            level = config.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}

/// Logs every resilience event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl ResilienceListener for TracingListener {
    fn on_event(&self, event: &ResilienceEvent) {
        match event {
            ResilienceEvent::StateChanged { from, to } => match to {
                CircuitState::Open => tracing::warn!(?from, ?to, "Circuit breaker opened"),
                _ => tracing::info!(?from, ?to, "Circuit breaker state changed"),
            },
            ResilienceEvent::Rejected => {
                tracing::debug!("Request rejected by open circuit");
            }
            ResilienceEvent::AttemptSucceeded { attempt, status } => {
                tracing::debug!(attempt, status, "Attempt succeeded");
            }
            ResilienceEvent::AttemptFailed { attempt, status, error } => {
                tracing::info!(attempt, ?status, error = error.as_deref(), "Attempt failed");
            }
            ResilienceEvent::RetryScheduled { attempt, delay } => {
                tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Retry scheduled");
            }
            ResilienceEvent::Cancelled { attempt, cause } => {
                tracing::info!(attempt, %cause, "Request cancelled before retry");
            }
            ResilienceEvent::Exhausted { attempts } => {
                tracing::warn!(attempts, "Retry attempts exhausted");
            }
        }
    }
}
