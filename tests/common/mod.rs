//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use resilient_transport::http::{OutboundRequest, Transport};
use resilient_transport::resilience::{ResilienceEvent, ResilienceListener, TransportError};

/// Start a programmable mock backend on an ephemeral port.
///
/// Every accepted connection reads the request head, asks `f` for a status and
/// body, writes the response and closes the connection.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend that answers with each status in `statuses` once, then 200.
pub async fn start_sequence_backend(statuses: Vec<u16>) -> (SocketAddr, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let statuses = Arc::new(statuses);
    let addr = start_programmable_backend(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) as usize;
        let status = statuses.get(n).copied().unwrap_or(200);
        async move { (status, format!("response {}", n + 1)) }
    })
    .await;
    (addr, calls)
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Transport that replays a script of outcomes and counts calls.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<u16, &'static str>>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<u16, &'static str>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport<OutboundRequest> for ScriptedTransport {
    type Response = StatusCode;

    async fn send(&self, _request: OutboundRequest) -> Result<StatusCode, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(200));
        next.map(|code| StatusCode::from_u16(code).unwrap())
            .map_err(TransportError::other)
    }
}

/// Listener that keeps every event it sees.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ResilienceEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<ResilienceEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ResilienceListener for RecordingListener {
    fn on_event(&self, event: &ResilienceEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
