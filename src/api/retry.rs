//! Retry classification and backoff for the text-generation endpoint

use reqwest::StatusCode;
use std::time::Duration;

/// What to do after a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// Transient: wait and try again
    Retryable,
    /// Rate or quota limit: stop the batch, retrying only burns quota
    QuotaExceeded,
    NonRetryable,
}

pub fn classify_status(status: StatusCode, body: &str) -> RetryDisposition {
    if status == StatusCode::TOO_MANY_REQUESTS || is_quota_message(body) {
        RetryDisposition::QuotaExceeded
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

pub fn classify_reqwest_error(err: &reqwest::Error) -> RetryDisposition {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        RetryDisposition::Retryable
    } else {
        RetryDisposition::NonRetryable
    }
}

fn is_quota_message(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("quota") || lower.contains("resource_exhausted")
}

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl BackoffPolicy {
    /// `base * 2^attempt`, capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt_index as u32).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
