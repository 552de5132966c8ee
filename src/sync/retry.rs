//! Per-batch retry decisions, kept free of any transport so they can be tested alone.

use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;

/// Linear backoff: attempt `n` that fails waits `n * backoff_step` before the next try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

/// Why an import attempt did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// 413: the payload itself is the problem.
    Oversize,
    /// Any other non-200 status.
    Status { status: StatusCode, body: String },
    /// Connection failure or timeout.
    Transport(String),
}

impl AttemptFailure {
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AttemptFailure::Oversize
        } else {
            AttemptFailure::Status { status, body }
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Oversize => write!(f, "request too large"),
            AttemptFailure::Status { status, body } => write!(f, "status {status}: {body}"),
            AttemptFailure::Transport(reason) => write!(f, "transport error: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
}

impl RetryPolicy {
    /// Decide what follows failed attempt number `attempt` (1-based).
    pub fn decide(&self, attempt: u32, failure: &AttemptFailure) -> RetryDecision {
        match failure {
            AttemptFailure::Oversize => RetryDecision::GiveUp,
            _ if attempt >= self.max_attempts => RetryDecision::GiveUp,
            _ => RetryDecision::RetryAfter(self.backoff_step.saturating_mul(attempt)),
        }
    }
}
