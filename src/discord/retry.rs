//! Retry policy for single API requests
//!
//! Each attempt is classified into an [`Attempt`]; the policy loops over that
//! classification instead of unwinding errors:
//! - 429: sleep the server-supplied `Retry-After`, retry
//! - 5xx, network failures, anything unexpected: sleep `base_delay * attempt`, retry
//! - 401/403 and other client errors: fail immediately
//! - 2xx: hand the raw body back to the caller

use crate::discord::transport::{RawResponse, Request, Transport, TransportError};
use crate::error::{Result, ScraperError};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Why an attempt is worth repeating
#[derive(Debug, Clone, PartialEq)]
pub enum RetryCause {
    RateLimited(Duration),
    Server(u16),
    Network(String),
    Unexpected(String),
}

impl RetryCause {
    /// Wait before the next attempt; rate limits ignore the attempt number
    pub fn delay(&self, base_delay: Duration, attempt: u32) -> Duration {
        match self {
            Self::RateLimited(wait) => *wait,
            _ => base_delay.saturating_mul(attempt),
        }
    }
}

impl fmt::Display for RetryCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited(wait) => write!(f, "rate limited for {:.3}s", wait.as_secs_f64()),
            Self::Server(status) => write!(f, "server error ({})", status),
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Unexpected(e) => write!(f, "unexpected error: {}", e),
        }
    }
}

/// Outcome of one attempt
#[derive(Debug)]
pub enum Attempt {
    Success(Vec<u8>),
    Retry(RetryCause),
    Fail(ScraperError),
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// `max_retries` counts retries after the first attempt
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Classify a transport result; `base_delay` stands in for a missing `Retry-After`
    pub fn classify(
        &self,
        operation: &str,
        result: std::result::Result<RawResponse, TransportError>,
    ) -> Attempt {
        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_network() => return Attempt::Retry(RetryCause::Network(e.to_string())),
            Err(e) => return Attempt::Retry(RetryCause::Unexpected(e.to_string())),
        };

        match response.status {
            200..=299 => Attempt::Success(response.body),
            429 => Attempt::Retry(RetryCause::RateLimited(
                response.retry_after.unwrap_or(self.base_delay),
            )),
            401 => Attempt::Fail(ScraperError::Unauthorized {
                operation: operation.to_string(),
                status: response.status,
            }),
            403 => Attempt::Fail(ScraperError::Forbidden {
                operation: operation.to_string(),
                status: response.status,
            }),
            status if status >= 500 => Attempt::Retry(RetryCause::Server(status)),
            status => Attempt::Fail(ScraperError::Status {
                operation: operation.to_string(),
                status,
                body: response.body_text(),
            }),
        }
    }

    /// Run `request` until it succeeds, fails terminally, or the budget runs out
    pub async fn execute<T: Transport>(
        &self,
        transport: &T,
        operation: &str,
        request: &Request,
    ) -> Result<Vec<u8>> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let cause = match self.classify(operation, transport.get(request).await) {
                Attempt::Success(body) => return Ok(body),
                Attempt::Fail(e) => {
                    if e.is_auth() {
                        tracing::error!(operation = %operation, error = %e, "Request rejected");
                    }
                    return Err(e);
                }
                Attempt::Retry(cause) => cause,
            };

            if attempt > self.max_retries {
                tracing::warn!(
                    operation = %operation,
                    attempts = attempt,
                    cause = %cause,
                    "Retry budget exhausted"
                );
                return Err(ScraperError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    cause: cause.to_string(),
                });
            }

            let delay = cause.delay(self.base_delay, attempt);
            tracing::warn!(
                operation = %operation,
                attempt = attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                cause = %cause,
                "Request failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
