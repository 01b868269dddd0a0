//! Resilient HTTP transport: circuit breaking and bounded retries around any
//! single-attempt request sender.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller
//!     │ send(request)
//!     ▼
//!  ┌──────────────────────── ResilientTransport ────────────────────────┐
//!  │  CircuitBreaker.is_allowed? ──no──▶ CircuitOpen                     │
//!  │      │ yes                                                          │
//!  │      ▼                                                              │
//!  │  attempt loop ── backoff (RetryStrategy) ── cancellable wait        │
//!  │      │                                                              │
//!  │      ▼                                                              │
//!  │  wrapped Transport ──▶ classify ──▶ on_success / on_failure         │
//!  └─────────────────────────────────────────────────────────────────────┘
//!     │
//!     ▼ response or ResilienceError
//! ```

pub mod config;
pub mod http;
pub mod observability;
pub mod resilience;

pub use crate::config::ResilienceConfig;
pub use crate::http::{HyperTransport, OutboundRequest, ResilientTransport, Transport};
pub use crate::resilience::{CircuitBreaker, ResilienceError, RetryStrategy};
