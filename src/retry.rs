use std::thread;
use std::time::Duration;

use crate::error::LifermapError;

/// Fixed-delay retry schedule. The observed upstream behavior waits the same
/// interval between attempts, so no exponential backoff here.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Receives one callback per failed attempt, for logging or UI surfacing.
pub trait DiagnosticSink: Send + Sync {
    fn attempt_failed(&self, attempt: u32, error: &LifermapError);
}

pub struct NoopDiagnostics;

impl DiagnosticSink for NoopDiagnostics {
    fn attempt_failed(&self, _attempt: u32, _error: &LifermapError) {}
}

/// Runs `op` with up to `policy.retries` retries, waiting `policy.delay`
/// between attempts. After exhaustion the result degrades to an empty vector
/// instead of an error: callers batching many keys rely on every task
/// settling so one bad key cannot sink the batch.
pub fn run_with_retry<T, F>(
    mut op: F,
    policy: RetryPolicy,
    diagnostics: &dyn DiagnosticSink,
) -> Vec<T>
where
    F: FnMut() -> Result<Vec<T>, LifermapError>,
{
    let attempts = policy.retries.saturating_add(1);
    for attempt in 1..=attempts {
        match op() {
            Ok(items) => return items,
            Err(error) => {
                tracing::warn!(attempt, %error, "fetch attempt failed");
                diagnostics.attempt_failed(attempt, &error);
                if attempt < attempts {
                    thread::sleep(policy.delay);
                }
            }
        }
    }
    Vec::new()
}
