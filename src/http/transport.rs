//! Resilient transport: circuit breaking and retries around a wrapped transport.
//!
//! # Data Flow
//! ```text
//! send(request)
//!     → breaker gate (CircuitOpen, no network call)
//!     → resendability check (RequestBodyNotRetriable, no network call)
//!     → attempt loop:
//!         backoff wait (attempt > 0, cancellable)
//!         → fresh copy of the request
//!         → wrapped transport (cancellable)
//!         → classify + record in breaker
//!         → success returns; breaker trip aborts; otherwise loop
//!     → exhausted: AllRetryAttemptsFailed (saw a transport error)
//!                  or MaxRetriesExceeded (only server errors)
//! ```

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::ResilienceConfig;
use crate::http::client::Transport;
use crate::http::request::ResendableRequest;
use crate::http::response::ResponseStatus;
use crate::resilience::backoff::RetryStrategy;
use crate::resilience::circuit_breaker::{Admission, CircuitBreaker};
use crate::resilience::events::{NoopListener, ResilienceEvent, ResilienceListener};
use crate::resilience::retries::{classify, AttemptOutcome, Failure};
use crate::resilience::timeouts::wait_for_backoff;
use crate::resilience::types::{ResilienceError, TransportError};

/// Decorates a [`Transport`] with a shared circuit breaker and bounded retries.
pub struct ResilientTransport<T> {
    inner: T,
    breaker: Arc<CircuitBreaker>,
    strategy: RetryStrategy,
    listener: Arc<dyn ResilienceListener>,
}

impl<T> ResilientTransport<T> {
    pub fn new(inner: T, breaker: Arc<CircuitBreaker>, strategy: RetryStrategy) -> Self {
        Self {
            inner,
            breaker,
            strategy,
            listener: Arc::new(NoopListener),
        }
    }

    /// Build a transport with its own breaker from a full configuration.
    ///
    /// The listener receives both attempt events and breaker state changes.
    pub fn from_config(
        inner: T,
        config: &ResilienceConfig,
        listener: Arc<dyn ResilienceListener>,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.circuit_breaker.clone())
            .with_listener(listener.clone());
        Self::new(inner, Arc::new(breaker), RetryStrategy::new(config.retry.clone()))
            .with_listener(listener)
    }

    pub fn with_listener(mut self, listener: Arc<dyn ResilienceListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn strategy(&self) -> &RetryStrategy {
        &self.strategy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Forward a best-effort in-flight cancel to the wrapped transport.
    pub fn cancel_request<Req>(&self, request: &Req)
    where
        T: Transport<Req>,
    {
        self.inner.cancel_request(request);
    }

    /// Send `request`, retrying transient failures within the attempt budget.
    pub async fn send<Req>(&self, request: Req) -> Result<T::Response, ResilienceError<T::Response>>
    where
        T: Transport<Req>,
        Req: ResendableRequest + Send,
    {
        let span = tracing::debug_span!("resilient_send", request_id = %Uuid::new_v4());
        self.send_inner(request).instrument(span).await
    }

    async fn send_inner<Req>(
        &self,
        request: Req,
    ) -> Result<T::Response, ResilienceError<T::Response>>
    where
        T: Transport<Req>,
        Req: ResendableRequest + Send,
    {
        let Some(admission) = self.breaker.try_admit() else {
            tracing::debug!("Circuit open, rejecting request");
            self.listener.on_event(&ResilienceEvent::Rejected);
            return Err(ResilienceError::CircuitOpen);
        };
        let mut probe = ProbeSlot::new(&self.breaker, admission);

        let budget = self.strategy.attempt_budget();
        if budget > 1 && !request.body_is_empty() && !request.can_resend() {
            return Err(ResilienceError::RequestBodyNotRetriable);
        }

        let signal = request.cancel_signal().clone();
        let mut original = Some(request);
        let mut last_err: Option<TransportError> = None;
        let mut last_response: Option<T::Response> = None;
        let mut attempts = 0;

        for attempt in 0..budget {
            if attempt > 0 {
                let Some(delay) = self.strategy.next_backoff(attempt) else {
                    break;
                };

                tracing::debug!(attempt, delay = ?delay, "Retrying request");
                self.listener
                    .on_event(&ResilienceEvent::RetryScheduled { attempt, delay });

                if let Err(cause) = wait_for_backoff(delay, &signal).await {
                    tracing::debug!(attempt, %cause, "Request cancelled during backoff");
                    self.listener
                        .on_event(&ResilienceEvent::Cancelled { attempt, cause });
                    return Err(ResilienceError::RequestCancelled { cause });
                }
            }

            // The last possible attempt sends the original; earlier ones send copies.
            let outbound = if attempt + 1 == budget {
                original.take()
            } else {
                original.as_ref().and_then(|r| r.try_clone())
            };
            let Some(outbound) = outbound else {
                return Err(ResilienceError::RequestBodyNotRetriable);
            };

            attempts = attempt + 1;
            let result = tokio::select! {
                biased;
                cause = signal.fired() => {
                    tracing::debug!(attempt, %cause, "Request cancelled during attempt");
                    self.listener
                        .on_event(&ResilienceEvent::Cancelled { attempt, cause });
                    return Err(ResilienceError::RequestCancelled { cause });
                }
                result = self.inner.send(outbound) => result,
            };

            match self.settle(attempt, result, &mut probe) {
                AttemptOutcome::Success(response) => return Ok(response),
                AttemptOutcome::FatalFailure(err) => return Err(err),
                AttemptOutcome::RetryableFailure(Failure::Transport(err)) => {
                    last_err = Some(err);
                }
                AttemptOutcome::RetryableFailure(Failure::Response(response)) => {
                    last_response = Some(response);
                }
            }
        }

        tracing::debug!(attempts, "Retry attempts exhausted");
        self.listener
            .on_event(&ResilienceEvent::Exhausted { attempts });

        match last_err {
            Some(source) => Err(ResilienceError::AllRetryAttemptsFailed { attempts, source }),
            None => Err(ResilienceError::MaxRetriesExceeded {
                attempts,
                last_response,
            }),
        }
    }

    /// Classify one attempt, record it in the breaker and decide whether the loop may go on.
    fn settle<R: ResponseStatus>(
        &self,
        attempt: u32,
        result: Result<R, TransportError>,
        probe: &mut ProbeSlot<'_>,
    ) -> AttemptOutcome<R> {
        probe.reported();
        match classify(result, self.breaker.config()) {
            AttemptOutcome::Success(response) => {
                self.breaker.on_success();
                self.listener.on_event(&ResilienceEvent::AttemptSucceeded {
                    attempt,
                    status: response.status_code(),
                });
                AttemptOutcome::Success(response)
            }
            AttemptOutcome::RetryableFailure(failure) => {
                self.breaker.on_failure();

                let error = match &failure {
                    Failure::Transport(e) => {
                        tracing::warn!(attempt, error = %e, "Attempt failed");
                        Some(e.to_string())
                    }
                    Failure::Response(r) => {
                        tracing::warn!(attempt, status = r.status_code(), "Attempt returned server error");
                        None
                    }
                };
                self.listener.on_event(&ResilienceEvent::AttemptFailed {
                    attempt,
                    status: failure.status(),
                    error,
                });

                match self.breaker.try_admit() {
                    Some(admission) => {
                        probe.hold(admission);
                        AttemptOutcome::RetryableFailure(failure)
                    }
                    None => {
                        tracing::warn!(attempt, "Circuit opened, abandoning retries");
                        AttemptOutcome::FatalFailure(ResilienceError::CircuitOpen)
                    }
                }
            }
            fatal @ AttemptOutcome::FatalFailure(_) => fatal,
        }
    }
}

/// A half-open probe slot held by one request.
///
/// Dropping it before an outcome is recorded hands the slot back, so a
/// cancelled or abandoned probe cannot wedge the breaker in half-open.
struct ProbeSlot<'a> {
    breaker: &'a CircuitBreaker,
    held: bool,
}

impl<'a> ProbeSlot<'a> {
    fn new(breaker: &'a CircuitBreaker, admission: Admission) -> Self {
        Self {
            breaker,
            held: admission == Admission::Probe,
        }
    }

    fn hold(&mut self, admission: Admission) {
        self.held = admission == Admission::Probe;
    }

    /// The breaker has seen this attempt's outcome and freed the slot itself.
    fn reported(&mut self) {
        self.held = false;
    }
}

impl Drop for ProbeSlot<'_> {
    fn drop(&mut self) {
        if self.held {
            self.breaker.release_probe();
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ResilientTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientTransport")
            .field("inner", &self.inner)
            .field("breaker", &self.breaker)
            .field("strategy", &self.strategy)
            .finish()
    }
}
