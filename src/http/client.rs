//! Wrapped transports.
//!
//! # Responsibilities
//! - Define the single-attempt send capability the resilience layer decorates
//! - Provide a pooled hyper client implementation with connect/request timeouts
//! - Adapt any cloneable tower service into a transport
//!
//! # Design Decisions
//! - Transports make exactly one attempt; retries and breaking live above them
//! - In-flight cancellation is optional and best-effort (`cancel_request`)

use std::future::Future;

use hyper::body::Incoming;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::{Service, ServiceExt};

use crate::config::TimeoutConfig;
use crate::http::request::{OutboundRequest, RequestBody};
use crate::http::response::ResponseStatus;
use crate::resilience::types::{BoxError, TransportError};

/// Sends one request and returns a response or an error. No retry or breaker logic.
pub trait Transport<Req>: Send + Sync {
    type Response: ResponseStatus + Send;

    fn send(&self, request: Req) -> impl Future<Output = Result<Self::Response, TransportError>> + Send;

    /// Best-effort abort of an in-flight request. Default: unsupported, does nothing.
    fn cancel_request(&self, _request: &Req) {}
}

/// Pooled HTTP/1.1 + HTTP/2 client built on hyper-util.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, RequestBody>,
    timeouts: TimeoutConfig,
}

impl HyperTransport {
    pub fn new(timeouts: TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeouts.connect()));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(timeouts.idle())
            .build(connector);

        Self { client, timeouts }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new(TimeoutConfig::default())
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl Transport<OutboundRequest> for HyperTransport {
    type Response = http::Response<Incoming>;

    async fn send(&self, request: OutboundRequest) -> Result<Self::Response, TransportError> {
        let timeout = self.timeouts.request();
        let request = request.into_http();

        tracing::trace!(method = %request.method(), uri = %request.uri(), "Sending attempt");

        match tokio::time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(TransportError::Http(e)),
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}

/// Adapts a cloneable tower service into a [`Transport`].
///
/// Each send clones the service and drives it with `oneshot`, so readiness is
/// awaited per attempt.
#[derive(Debug, Clone)]
pub struct ServiceTransport<S> {
    service: S,
}

impl<S> ServiceTransport<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn get_ref(&self) -> &S {
        &self.service
    }
}

impl<S, Req> Transport<Req> for ServiceTransport<S>
where
    S: Service<Req> + Clone + Send + Sync,
    S::Response: ResponseStatus + Send,
    S::Error: Into<BoxError>,
    S::Future: Send,
    Req: Send,
{
    type Response = S::Response;

    fn send(&self, request: Req) -> impl Future<Output = Result<Self::Response, TransportError>> + Send {
        let service = self.service.clone();
        async move {
            service
                .oneshot(request)
                .await
                .map_err(|e| TransportError::Other(e.into()))
        }
    }
}
