//! Attempt outcome classification.
//!
//! # Responsibilities
//! - Turn the raw result of one attempt into a tagged outcome
//! - Decide what counts as a failure for the circuit breaker
//!
//! # Design Decisions
//! - Transport errors and responses at or above the server error threshold are
//!   retryable failures; everything else is success
//! - A failure that trips the breaker becomes fatal and ends the retry loop

use crate::config::CircuitBreakerConfig;
use crate::http::response::ResponseStatus;
use crate::resilience::types::{ResilienceError, TransportError};

/// Result of a single attempt after classification.
#[derive(Debug)]
pub enum AttemptOutcome<R> {
    /// The target answered below the server error threshold.
    Success(R),
    /// The attempt failed but another one may be made.
    RetryableFailure(Failure<R>),
    /// The loop must stop with this error.
    FatalFailure(ResilienceError<R>),
}

/// A failed attempt: either a server-error response or a transport error.
#[derive(Debug)]
pub enum Failure<R> {
    Response(R),
    Transport(TransportError),
}

impl<R: ResponseStatus> Failure<R> {
    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Response(r) => Some(r.status_code()),
            Failure::Transport(_) => None,
        }
    }
}

/// Classify one attempt's result using the breaker's notion of a failure status.
pub fn classify<R: ResponseStatus>(
    result: Result<R, TransportError>,
    breaker: &CircuitBreakerConfig,
) -> AttemptOutcome<R> {
    match result {
        Ok(response) if breaker.is_failure_status(response.status_code()) => {
            AttemptOutcome::RetryableFailure(Failure::Response(response))
        }
        Ok(response) => AttemptOutcome::Success(response),
        Err(err) => AttemptOutcome::RetryableFailure(Failure::Transport(err)),
    }
}

#[cfg(test)]
mod tests {
    use http::{Response, StatusCode};

    use super::*;

    fn threshold(server_error_threshold: u16) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            server_error_threshold,
            ..Default::default()
        }
    }

    fn response(status: StatusCode) -> Result<Response<()>, TransportError> {
        let mut r = Response::new(());
        *r.status_mut() = status;
        Ok(r)
    }

    #[test]
    fn test_server_errors_are_retryable() {
        match classify(response(StatusCode::SERVICE_UNAVAILABLE), &threshold(500)) {
            AttemptOutcome::RetryableFailure(failure) => assert_eq!(failure.status(), Some(503)),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_client_errors_are_success() {
        // 4xx is the caller's problem, not the target's health.
        assert!(matches!(
            classify(response(StatusCode::NOT_FOUND), &threshold(500)),
            AttemptOutcome::Success(_)
        ));
        assert!(matches!(
            classify(response(StatusCode::TOO_MANY_REQUESTS), &threshold(500)),
            AttemptOutcome::Success(_)
        ));
    }

    #[test]
    fn test_threshold_is_configurable() {
        assert!(matches!(
            classify(response(StatusCode::TOO_MANY_REQUESTS), &threshold(429)),
            AttemptOutcome::RetryableFailure(Failure::Response(_))
        ));
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let outcome =
            classify::<Response<()>>(Err(TransportError::other("reset by peer")), &threshold(500));
        match outcome {
            AttemptOutcome::RetryableFailure(failure) => {
                assert_eq!(failure.status(), None);
                assert!(matches!(failure, Failure::Transport(_)));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
