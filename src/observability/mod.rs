//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resilience core
//!     → ResilienceEvent
//!     → logging.rs (TracingListener: structured log lines)
//!     → metrics.rs (MetricsListener: counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - The core only emits events; recording them happens here
//! - Metrics are cheap (atomic increments in the recorder)

pub mod logging;
pub mod metrics;

use std::sync::Arc;

use crate::resilience::events::Listeners;

pub use self::logging::{init_logging, TracingListener};
pub use self::metrics::{init_metrics, MetricsListener};

/// Listener set that both logs and records metrics.
pub fn default_listeners() -> Listeners {
    Listeners::new()
        .with(Arc::new(TracingListener))
        .with(Arc::new(MetricsListener))
}
