//! Command-line client that sends requests through the resilient transport.
//!
//! ```text
//! resilient-transport http://127.0.0.1:3000/health -n 20 --config resilience.toml
//! ```
//!
//! Each request's outcome is printed as it completes; the circuit breaker
//! snapshot is printed as JSON at the end.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use http::{Method, Uri};

use resilient_transport::config::{load_config, ResilienceConfig};
use resilient_transport::observability::{self, init_logging, init_metrics};
use resilient_transport::{HyperTransport, OutboundRequest, ResilienceError, ResilientTransport};

#[derive(Parser)]
#[command(name = "resilient-transport")]
#[command(about = "Send HTTP requests through a circuit breaker and retry layer", long_about = None)]
struct Cli {
    /// Target URL.
    url: String,

    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of requests to send.
    #[arg(short = 'n', long, default_value_t = 1)]
    requests: u32,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Per-request deadline in milliseconds, covering retries and backoff.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause between requests in milliseconds.
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ResilienceConfig::default(),
    };

    init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    tracing::info!(
        failure_threshold = config.circuit_breaker.failure_threshold,
        reset_timeout_ms = config.circuit_breaker.reset_timeout_ms,
        max_attempts = config.retry.max_attempts,
        "Configuration loaded"
    );

    let uri: Uri = cli.url.parse()?;
    let method: Method = cli.method.parse()?;

    let transport = ResilientTransport::from_config(
        HyperTransport::new(config.timeouts.clone()),
        &config,
        Arc::new(observability::default_listeners()),
    );

    for n in 1..=cli.requests {
        let mut request = OutboundRequest::new(method.clone(), uri.clone());
        if let Some(data) = &cli.data {
            request = request.with_body(data.clone());
        }
        if let Some(ms) = cli.timeout_ms {
            request = request.with_timeout(Duration::from_millis(ms));
        }

        match transport.send(request).await {
            Ok(response) => println!("#{n}: {}", response.status()),
            Err(ResilienceError::MaxRetriesExceeded {
                attempts,
                last_response: Some(response),
            }) => println!("#{n}: {} (gave up after {attempts} attempts)", response.status()),
            Err(e) => println!("#{n}: error: {e}"),
        }

        if cli.interval_ms > 0 && n < cli.requests {
            tokio::time::sleep(Duration::from_millis(cli.interval_ms)).await;
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&transport.breaker().snapshot())?
    );
    Ok(())
}
