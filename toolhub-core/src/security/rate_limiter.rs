//! Sliding-window rate limiter keyed by tool name

use super::SecurityError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Time source for the limiter
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Sliding-window limiter.
///
/// An invocation at `T` counts against its tool until `T + window`. The
/// check-and-append step runs under a per-tool lock so two concurrent callers
/// can never both take the last slot.
pub struct RateLimiter {
    max_calls: i64,
    window: Duration,
    clock: Arc<dyn Clock>,
    buckets: std::sync::Mutex<HashMap<String, Arc<Mutex<VecDeque<Instant>>>>>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_calls", &self.max_calls)
            .field("window", &self.window)
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter using the system clock.
    ///
    /// `max_calls <= 0` disables limiting.
    pub fn new(max_calls: i64, window: Duration) -> Self {
        Self::with_clock(max_calls, window, Arc::new(SystemClock))
    }

    /// Create a limiter with an injected clock
    pub fn with_clock(max_calls: i64, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_calls,
            window,
            clock,
            buckets: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Whether limiting is active at all
    pub fn is_enabled(&self) -> bool {
        self.max_calls > 0
    }

    /// Record an invocation of `tool`, or reject it if the window is full
    pub async fn check(&self, tool: &str) -> Result<(), SecurityError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let bucket = self.bucket(tool);
        let mut history = bucket.lock().await;
        let now = self.clock.now();

        while let Some(oldest) = history.front() {
            if now.saturating_duration_since(*oldest) > self.window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() as i64 >= self.max_calls {
            let retry_after = history
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .unwrap_or_default();
            return Err(SecurityError::RateLimited {
                tool: tool.to_string(),
                retry_after_secs: retry_after.as_millis().div_ceil(1000) as u64,
            });
        }

        history.push_back(now);
        Ok(())
    }

    fn bucket(&self, tool: &str) -> Arc<Mutex<VecDeque<Instant>>> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(buckets.entry(tool.to_string()).or_default())
    }
}
