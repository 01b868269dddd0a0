//! Tower middleware wrapping a service in a [`ResilientTransport`].

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::config::ResilienceConfig;
use crate::http::client::{ServiceTransport, Transport};
use crate::http::request::ResendableRequest;
use crate::http::transport::ResilientTransport;
use crate::resilience::backoff::RetryStrategy;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::events::{NoopListener, ResilienceListener};
use crate::resilience::types::ResilienceError;

/// Applies circuit breaking and retries to the wrapped service.
///
/// Every `layer` call builds a fresh breaker unless one was supplied with
/// [`with_breaker`](Self::with_breaker), in which case all layered services share it.
#[derive(Clone)]
pub struct ResilienceLayer {
    config: ResilienceConfig,
    breaker: Option<Arc<CircuitBreaker>>,
    listener: Arc<dyn ResilienceListener>,
}

impl ResilienceLayer {
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            config,
            breaker: None,
            listener: Arc::new(NoopListener),
        }
    }

    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ResilienceListener>) -> Self {
        self.listener = listener;
        self
    }
}

impl<S> Layer<S> for ResilienceLayer {
    type Service = ResilienceService<ServiceTransport<S>>;

    fn layer(&self, inner: S) -> Self::Service {
        let transport = ServiceTransport::new(inner);
        let resilient = match &self.breaker {
            Some(breaker) => ResilientTransport::new(
                transport,
                breaker.clone(),
                RetryStrategy::new(self.config.retry.clone()),
            )
            .with_listener(self.listener.clone()),
            None => ResilientTransport::from_config(transport, &self.config, self.listener.clone()),
        };
        ResilienceService::new(resilient)
    }
}

/// A [`ResilientTransport`] exposed as a tower [`Service`].
pub struct ResilienceService<T> {
    inner: Arc<ResilientTransport<T>>,
}

impl<T> ResilienceService<T> {
    pub fn new(transport: ResilientTransport<T>) -> Self {
        Self {
            inner: Arc::new(transport),
        }
    }

    pub fn transport(&self) -> &ResilientTransport<T> {
        &self.inner
    }
}

impl<T> Clone for ResilienceService<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, Req> Service<Req> for ResilienceService<T>
where
    T: Transport<Req> + 'static,
    T::Response: 'static,
    Req: ResendableRequest + Send + 'static,
{
    type Response = T::Response;
    type Error = ResilienceError<T::Response>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The breaker is consulted per call so an open circuit fails fast instead of stalling.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Req) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { inner.send(request).await })
    }
}
