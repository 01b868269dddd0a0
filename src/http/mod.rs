//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → request.rs (OutboundRequest: replayable body + cancel signal)
//!     → transport.rs (ResilientTransport: breaker gate, attempt loop)
//!     → client.rs (wrapped Transport: hyper client or tower service)
//!     → response.rs (status code drives classification)
//!     → Caller
//!
//! Tower users:
//!     layer.rs (ResilienceLayer) → ResilienceService → transport.rs
//! ```

pub mod client;
pub mod layer;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{HyperTransport, ServiceTransport, Transport};
pub use layer::{ResilienceLayer, ResilienceService};
pub use request::{OutboundRequest, RequestBody, ResendableRequest};
pub use response::ResponseStatus;
pub use transport::ResilientTransport;
