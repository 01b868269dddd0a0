//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges. Validation is a pure
//! function that reports every problem rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ResilienceConfig;

/// A single semantic problem in a [`ResilienceConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("circuit_breaker.failure_threshold must be at least 1")]
    FailureThreshold,

    #[error("circuit_breaker.half_open_success_needed must be at least 1")]
    HalfOpenSuccessNeeded,

    #[error("circuit_breaker.server_error_threshold {0} is not an HTTP status code")]
    ServerErrorThreshold(u16),

    #[error("retry.max_attempts must be at least 1")]
    MaxAttempts,

    #[error("retry.multiplier {0} must be a finite number >= 1")]
    Multiplier(f64),

    #[error("retry.random_factor {0} must be in [0, 1)")]
    RandomFactor(f64),

    #[error("retry.initial_interval_ms {initial} exceeds retry.max_interval_ms {max}")]
    IntervalOrder { initial: u64, max: u64 },

    #[error("timeouts.request_secs must be greater than 0")]
    RequestTimeout,

    #[error("observability.log_format {0:?} must be \"pretty\" or \"json\"")]
    LogFormat(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let breaker = &config.circuit_breaker;
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::FailureThreshold);
    }
    if breaker.half_open_success_needed == 0 {
        errors.push(ValidationError::HalfOpenSuccessNeeded);
    }
    if !(100..=599).contains(&breaker.server_error_threshold) {
        errors.push(ValidationError::ServerErrorThreshold(breaker.server_error_threshold));
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::MaxAttempts);
    }
    if !retry.multiplier.is_finite() || retry.multiplier < 1.0 {
        errors.push(ValidationError::Multiplier(retry.multiplier));
    }
    if !(0.0..1.0).contains(&retry.random_factor) {
        errors.push(ValidationError::RandomFactor(retry.random_factor));
    }
    if retry.initial_interval_ms > retry.max_interval_ms {
        errors.push(ValidationError::IntervalOrder {
            initial: retry.initial_interval_ms,
            max: retry.max_interval_ms,
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    let format = config.observability.log_format.as_str();
    if format != "pretty" && format != "json" {
        errors.push(ValidationError::LogFormat(format.to_string()));
    }

    let address = config.observability.metrics_address.as_str();
    if address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::MetricsAddress(address.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
