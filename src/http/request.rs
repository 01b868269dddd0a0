//! Outbound requests that can be replayed.
//!
//! # Responsibilities
//! - Describe what the retry loop needs from a request (`ResendableRequest`)
//! - Provide a concrete HTTP request whose body may be empty, buffered or streaming
//! - Carry the caller's cancellation scope into every retried copy
//!
//! # Design Decisions
//! - Buffered bodies are `Bytes`, so each copy is a cheap refcount bump
//! - Streaming bodies are single-read and make the request non-resendable
//! - Headers, method and URI are cloned per attempt; the original is never mutated

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Uri, Version};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full, Limited};
use hyper::body::Body;

use crate::resilience::timeouts::CancelSignal;
use crate::resilience::types::BoxError;

/// Body type handed to the HTTP client.
pub type RequestBody = BoxBody<Bytes, BoxError>;

/// Capabilities the retry loop needs from a request.
pub trait ResendableRequest: Sized {
    /// True if the request carries no body bytes.
    fn body_is_empty(&self) -> bool;

    /// True if [`try_clone`](Self::try_clone) can produce a fresh copy.
    fn can_resend(&self) -> bool;

    /// A fresh, independent copy with a readable body and the same cancellation scope.
    fn try_clone(&self) -> Option<Self>;

    /// The caller's cancellation scope for this request.
    fn cancel_signal(&self) -> &CancelSignal;
}

enum Payload {
    Empty,
    Buffered(Bytes),
    Streaming(RequestBody),
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Empty => f.write_str("Empty"),
            Payload::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            Payload::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// An HTTP request headed for the wrapped transport.
#[derive(Debug)]
pub struct OutboundRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    payload: Payload,
    signal: CancelSignal,
}

impl OutboundRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            payload: Payload::Empty,
            signal: CancelSignal::new(),
        }
    }

    pub fn get(uri: Uri) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: Uri, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, uri).with_body(body)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Attach a buffered body. Buffered requests can always be retried.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let bytes = body.into();
        self.payload = if bytes.is_empty() {
            Payload::Empty
        } else {
            Payload::Buffered(bytes)
        };
        self
    }

    /// Attach a single-read body. Unless it is empty, the request can only be sent once.
    pub fn with_streaming_body(mut self, body: RequestBody) -> Self {
        self.payload = Payload::Streaming(body);
        self
    }

    pub fn with_signal(mut self, signal: CancelSignal) -> Self {
        self.signal = signal;
        self
    }

    /// Shorthand for a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.signal = self.signal.with_timeout(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Read a streaming body into memory so the request becomes resendable.
    ///
    /// Fails if the body exceeds `limit` bytes or errors while reading.
    pub async fn buffer_body(mut self, limit: usize) -> Result<Self, BoxError> {
        if let Payload::Streaming(body) = self.payload {
            let bytes = Limited::new(body, limit).collect().await?.to_bytes();
            self.payload = Payload::Empty;
            return Ok(self.with_body(bytes));
        }
        Ok(self)
    }

    /// Convert into an `http::Request` for sending.
    pub fn into_http(self) -> Request<RequestBody> {
        let body = match self.payload {
            Payload::Empty => Empty::<Bytes>::new().map_err(|never| match never {}).boxed(),
            Payload::Buffered(bytes) => Full::new(bytes).map_err(|never| match never {}).boxed(),
            Payload::Streaming(body) => body,
        };

        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.version_mut() = self.version;
        *request.headers_mut() = self.headers;
        request
    }
}

impl From<Request<Bytes>> for OutboundRequest {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut outbound = OutboundRequest::new(parts.method, parts.uri)
            .version(parts.version)
            .with_body(body);
        outbound.headers = parts.headers;
        outbound
    }
}

impl ResendableRequest for OutboundRequest {
    fn body_is_empty(&self) -> bool {
        match &self.payload {
            Payload::Empty => true,
            Payload::Buffered(bytes) => bytes.is_empty(),
            Payload::Streaming(body) => body.is_end_stream() || body.size_hint().exact() == Some(0),
        }
    }

    fn can_resend(&self) -> bool {
        !matches!(self.payload, Payload::Streaming(_)) || self.body_is_empty()
    }

    fn try_clone(&self) -> Option<Self> {
        let payload = match &self.payload {
            Payload::Empty => Payload::Empty,
            Payload::Buffered(bytes) => Payload::Buffered(bytes.clone()),
            Payload::Streaming(_) if self.body_is_empty() => Payload::Empty,
            Payload::Streaming(_) => return None,
        };

        Some(Self {
            method: self.method.clone(),
            uri: self.uri.clone(),
            version: self.version,
            headers: self.headers.clone(),
            payload,
            signal: self.signal.clone(),
        })
    }

    fn cancel_signal(&self) -> &CancelSignal {
        &self.signal
    }
}
