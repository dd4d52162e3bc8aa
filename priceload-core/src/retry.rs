//! Bounded retry with fixed backoff for remote calls.
//!
//! Every remote operation (price fetch, object read, object write) goes through
//! [`RetryPolicy::execute`]. The policy is a value, so fetch and store calls can
//! be tuned independently. Backoff is fixed, not exponential.

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// A single failed remote attempt. All variants are treated as transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("response decode error: {0}")]
    Decode(String),

    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("object store error: {0}")]
    Store(String),
}

/// All attempts of a remote call failed. Carries the last attempt's cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{call} failed after {attempts} attempt(s): {cause}")]
pub struct RemoteCallFailed {
    pub call: String,
    pub attempts: u32,
    #[source]
    pub cause: RemoteError,
}

/// How many times to attempt a remote call and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on invocations. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Upstream price API: 3 attempts, 10 s apart.
    pub const FETCH: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_secs(10),
    };

    /// Object store: 2 attempts, 5 s apart.
    pub const STORE: RetryPolicy = RetryPolicy {
        max_attempts: 2,
        backoff: Duration::from_secs(5),
    };

    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Same attempt budget, no waiting. Used by tests and dry runs.
    pub fn without_backoff(self) -> Self {
        Self {
            backoff: Duration::ZERO,
            ..self
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent, sleeping the
    /// calling thread between attempts.
    pub fn execute<T, F>(&self, call: &str, op: F) -> Result<T, RemoteCallFailed>
    where
        F: FnMut() -> Result<T, RemoteError>,
    {
        self.execute_with_sleep(call, op, std::thread::sleep)
    }

    /// [`execute`](Self::execute) with an injectable sleep.
    pub fn execute_with_sleep<T, F, S>(
        &self,
        call: &str,
        mut op: F,
        mut sleep: S,
    ) -> Result<T, RemoteCallFailed>
    where
        F: FnMut() -> Result<T, RemoteError>,
        S: FnMut(Duration),
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(call, attempt, "remote call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(cause) if attempt < max_attempts => {
                    warn!(
                        call,
                        attempt,
                        max_attempts,
                        error = %cause,
                        "remote call failed, retrying in {}s",
                        self.backoff.as_secs_f64()
                    );
                    sleep(self.backoff);
                    attempt += 1;
                }
                Err(cause) => {
                    warn!(call, attempt, error = %cause, "remote call failed, giving up");
                    return Err(RemoteCallFailed {
                        call: call.to_string(),
                        attempts: attempt,
                        cause,
                    });
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::FETCH
    }
}
