//! Cancellation and deadline handling.
//!
//! # Responsibilities
//! - Carry a request's cancellation token and optional deadline
//! - Race the inter-attempt backoff wait against that signal
//!
//! # Design Decisions
//! - Uses Tokio's timer and `select!`; the losing branch is dropped, so no
//!   timer outlives the wait on any exit path
//! - Cancellation is checked before sleeping and wins ties

use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::resilience::types::CancelCause;

/// A request's cancellation scope: an explicit token plus an optional deadline.
///
/// Clones share the same token, so a retried copy of a request stays in the
/// caller's cancellation scope.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing token, e.g. a child of a server-wide shutdown token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set the deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fire the token. Every clone of this signal observes it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the cause if the signal has already fired.
    pub fn check(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            Some(CancelCause::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(CancelCause::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves when the token fires or the deadline passes.
    pub async fn fired(&self) -> CancelCause {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => CancelCause::Cancelled,
                _ = sleep_until(deadline) => CancelCause::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                CancelCause::Cancelled
            }
        }
    }
}

/// Wait out a backoff delay unless `signal` fires first.
pub async fn wait_for_backoff(delay: Duration, signal: &CancelSignal) -> Result<(), CancelCause> {
    if let Some(cause) = signal.check() {
        return Err(cause);
    }

    tokio::select! {
        biased;
        cause = signal.fired() => Err(cause),
        _ = sleep(delay) => Ok(()),
    }
}
