//! End-to-end behavior of the resilient transport against a scripted sender.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};

use resilient_transport::config::{parse_config, ResilienceConfig};
use resilient_transport::http::OutboundRequest;
use resilient_transport::resilience::{
    CancelCause, CancelSignal, CircuitState, ResilienceError, ResilienceEvent,
};
use resilient_transport::ResilientTransport;

mod common;
use common::{RecordingListener, ScriptedTransport};

fn config(toml: &str) -> ResilienceConfig {
    parse_config(toml).unwrap()
}

fn get() -> OutboundRequest {
    OutboundRequest::get("http://target.local/".parse().unwrap())
}

#[tokio::test(start_paused = true)]
async fn test_three_transport_errors_trip_the_breaker() {
    let cfg = config(
        r#"
        [circuit_breaker]
        failure_threshold = 3
        reset_timeout_ms = 30000

        [retry]
        max_attempts = 1
        "#,
    );
    let listener = Arc::new(RecordingListener::default());
    let transport = ResilientTransport::from_config(
        ScriptedTransport::new(vec![Err("refused"), Err("refused"), Err("refused")]),
        &cfg,
        listener.clone(),
    );

    for _ in 0..2 {
        let err = transport.send(get()).await.unwrap_err();
        assert!(matches!(err, ResilienceError::AllRetryAttemptsFailed { attempts: 1, .. }));
    }
    assert_eq!(transport.breaker().state(), CircuitState::Closed);

    // The third failure trips the breaker while the request is in flight.
    let err = transport.send(get()).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(transport.breaker().state(), CircuitState::Open);
    assert_eq!(transport.inner().calls(), 3);

    let err = transport.send(get()).await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(transport.inner().calls(), 3);

    let events = listener.events();
    assert!(events.contains(&ResilienceEvent::StateChanged {
        from: CircuitState::Closed,
        to: CircuitState::Open,
    }));
    assert_eq!(events.last(), Some(&ResilienceEvent::Rejected));
}

#[tokio::test(start_paused = true)]
async fn test_two_server_errors_then_success() {
    let cfg = config(
        r#"
        [retry]
        max_attempts = 3
        initial_interval_ms = 50
        random_factor = 0.0
        "#,
    );
    let listener = Arc::new(RecordingListener::default());
    let transport = ResilientTransport::from_config(
        ScriptedTransport::new(vec![Ok(500), Ok(500), Ok(200)]),
        &cfg,
        listener.clone(),
    );

    let response = transport.send(get()).await.unwrap();
    assert_eq!(response, StatusCode::OK);
    assert_eq!(transport.inner().calls(), 3);
    assert_eq!(transport.breaker().state(), CircuitState::Closed);
    assert_eq!(transport.breaker().failure_count(), 0);

    let recorded: Vec<_> = listener
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ResilienceEvent::AttemptFailed { status, .. } => Some(status),
            ResilienceEvent::AttemptSucceeded { status, .. } => Some(Some(status)),
            _ => None,
        })
        .collect();
    assert_eq!(recorded, vec![Some(500), Some(500), Some(200)]);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_backoff_wait() {
    let cfg = config(
        r#"
        [retry]
        max_attempts = 3
        initial_interval_ms = 200
        random_factor = 0.0
        "#,
    );
    let transport = ResilientTransport::from_config(
        ScriptedTransport::new(vec![Ok(503), Ok(200)]),
        &cfg,
        Arc::new(RecordingListener::default()),
    );

    let start = tokio::time::Instant::now();
    let request = get().with_timeout(Duration::from_millis(50));
    let err = transport.send(request).await.unwrap_err();

    assert!(matches!(
        err,
        ResilienceError::RequestCancelled { cause: CancelCause::DeadlineExceeded }
    ));
    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(transport.inner().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_caller_cancel_stops_retries() {
    let cfg = config(
        r#"
        [retry]
        max_attempts = 5
        initial_interval_ms = 1000
        "#,
    );
    let transport = Arc::new(ResilientTransport::from_config(
        ScriptedTransport::new(vec![Err("reset"); 5]),
        &cfg,
        Arc::new(RecordingListener::default()),
    ));

    let signal = CancelSignal::new();
    let request = get().with_signal(signal.clone());
    let task = {
        let transport = transport.clone();
        tokio::spawn(async move { transport.send(request).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    signal.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        ResilienceError::RequestCancelled { cause: CancelCause::Cancelled }
    ));
    assert_eq!(transport.inner().calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_success_closes_circuit() {
    let cfg = config(
        r#"
        [circuit_breaker]
        failure_threshold = 1
        reset_timeout_ms = 1000
        half_open_success_needed = 1

        [retry]
        enabled = false
        "#,
    );
    let transport = ResilientTransport::from_config(
        ScriptedTransport::new(vec![Ok(502), Ok(200)]),
        &cfg,
        Arc::new(RecordingListener::default()),
    );

    assert!(transport.send(get()).await.unwrap_err().is_circuit_open());
    assert!(transport.send(get()).await.unwrap_err().is_circuit_open());
    assert_eq!(transport.inner().calls(), 1);

    tokio::time::advance(Duration::from_millis(1000)).await;

    let response = transport.send(get()).await.unwrap();
    assert_eq!(response, StatusCode::OK);
    assert_eq!(transport.breaker().state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_unreplayable_body_makes_no_calls() {
    let cfg = ResilienceConfig::default();
    let transport = ResilientTransport::from_config(
        ScriptedTransport::new(vec![]),
        &cfg,
        Arc::new(RecordingListener::default()),
    );

    let body = Full::new(Bytes::from_static(b"payload"))
        .map_err(|never| match never {})
        .boxed();
    let request = OutboundRequest::new(Method::POST, "http://target.local/".parse().unwrap())
        .with_streaming_body(body);

    let err = transport.send(request).await.unwrap_err();
    assert!(matches!(err, ResilienceError::RequestBodyNotRetriable));
    assert_eq!(transport.inner().calls(), 0);
}
