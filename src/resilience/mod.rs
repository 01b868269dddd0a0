//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound request:
//!     → circuit_breaker.rs (gate: is the target accepting traffic?)
//!     → wrapped transport sends one attempt
//!     → retries.rs (classify: success / retryable / fatal)
//!     → circuit_breaker.rs (record outcome, maybe trip)
//!     → backoff.rs (delay before next attempt)
//!     → timeouts.rs (wait, unless the caller cancels first)
//! ```
//!
//! # Design Decisions
//! - The breaker is shared across requests; the backoff strategy is stateless
//! - Cancellation always wins over a pending retry wait
//! - The core emits events (events.rs); logging and metrics live in observability

pub mod backoff;
pub mod circuit_breaker;
pub mod events;
pub mod retries;
pub mod timeouts;
pub mod types;

pub use backoff::RetryStrategy;
pub use circuit_breaker::{Admission, CircuitBreaker, CircuitSnapshot, CircuitState};
pub use events::{Listeners, NoopListener, ResilienceEvent, ResilienceListener};
pub use retries::{classify, AttemptOutcome, Failure};
pub use timeouts::{wait_for_backoff, CancelSignal};
pub use types::{BoxError, CancelCause, ResilienceError, TransportError};
