//! Error kinds surfaced by the resilience layer.

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used for opaque transport and body failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure reported by a wrapped transport for a single attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP client error: {0}")]
    Http(#[from] hyper_util::client::legacy::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(BoxError),
}

impl TransportError {
    /// Wrap any error as an opaque transport failure.
    pub fn other(err: impl Into<BoxError>) -> Self {
        TransportError::Other(err.into())
    }

    /// Returns true if the failure happened while establishing a connection.
    pub fn is_connect(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_connect(),
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}

/// Why a request's cancellation signal fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CancelCause {
    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

/// Error returned by [`ResilientTransport::send`](crate::http::ResilientTransport::send).
///
/// `R` is the wrapped transport's response type. When every attempt ends in a
/// server-error response, the last one is handed back inside
/// [`ResilienceError::MaxRetriesExceeded`] so callers can still inspect it.
pub enum ResilienceError<R> {
    /// The circuit breaker refused the request, or tripped during it.
    CircuitOpen,

    /// The request body cannot be replayed, so retries were refused up front.
    RequestBodyNotRetriable,

    /// Attempts ran out without a transport error.
    MaxRetriesExceeded {
        attempts: u32,
        last_response: Option<R>,
    },

    /// Attempts ran out and at least one of them failed at the transport level.
    AllRetryAttemptsFailed {
        attempts: u32,
        source: TransportError,
    },

    /// The caller cancelled the request or its deadline passed during a backoff wait.
    RequestCancelled { cause: CancelCause },
}

impl<R> ResilienceError<R> {
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen)
    }

    /// Take the last server-error response out of an exhausted request.
    pub fn into_last_response(self) -> Option<R> {
        match self {
            ResilienceError::MaxRetriesExceeded { last_response, .. } => last_response,
            _ => None,
        }
    }
}

impl<R> fmt::Display for ResilienceError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResilienceError::CircuitOpen => write!(f, "circuit breaker is open"),
            ResilienceError::RequestBodyNotRetriable => {
                write!(f, "request body cannot be replayed for retries")
            }
            ResilienceError::MaxRetriesExceeded { attempts, .. } => {
                write!(f, "max retries exceeded after {} attempts", attempts)
            }
            ResilienceError::AllRetryAttemptsFailed { attempts, source } => {
                write!(f, "all {} retry attempts failed: {}", attempts, source)
            }
            ResilienceError::RequestCancelled { cause } => write!(f, "{}", cause),
        }
    }
}

impl<R> fmt::Debug for ResilienceError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResilienceError::CircuitOpen => f.write_str("CircuitOpen"),
            ResilienceError::RequestBodyNotRetriable => f.write_str("RequestBodyNotRetriable"),
            ResilienceError::MaxRetriesExceeded { attempts, last_response } => f
                .debug_struct("MaxRetriesExceeded")
                .field("attempts", attempts)
                .field("has_last_response", &last_response.is_some())
                .finish(),
            ResilienceError::AllRetryAttemptsFailed { attempts, source } => f
                .debug_struct("AllRetryAttemptsFailed")
                .field("attempts", attempts)
                .field("source", source)
                .finish(),
            ResilienceError::RequestCancelled { cause } => f
                .debug_struct("RequestCancelled")
                .field("cause", cause)
                .finish(),
        }
    }
}

impl<R> StdError for ResilienceError<R> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ResilienceError::AllRetryAttemptsFailed { source, .. } => Some(source),
            ResilienceError::RequestCancelled { cause } => Some(cause),
            _ => None,
        }
    }
}
