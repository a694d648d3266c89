//! Fixed-window rate limiting per tool name.

use crate::config::RateLimitConfig;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Interval between sweeps of expired windows.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Per-key fixed-window counter.
///
/// A key's window starts on its first call and lasts `config.window`. Calls
/// past `config.max_requests` inside a window are rejected. Expired windows
/// are deleted by a background sweep so idle keys do not accumulate.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Creates a limiter. No sweep runs until [`start_sweep`](Self::start_sweep).
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Records a call for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimitExceeded`] when the window is exhausted. The
    /// rejected call does not count.
    pub fn check(&self, key: &str) -> Result<()> {
        self.check_at(key, Instant::now())
    }

    /// Records a call for `key` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RateLimitExceeded`] when the window is exhausted.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<()> {
        let mut windows = self.lock_windows()?;

        match windows.get_mut(key) {
            Some(window) if now <= window.reset_at => {
                if window.count >= self.config.max_requests {
                    tracing::warn!(
                        key,
                        max_requests = self.config.max_requests,
                        window = ?self.config.window,
                        "Rate limit exceeded"
                    );
                    metrics::counter!("mcp_rate_limit_exceeded_total", "tool" => key.to_string())
                        .increment(1);
                    return Err(Error::RateLimitExceeded {
                        key: key.to_string(),
                        max_requests: self.config.max_requests,
                        window: self.config.window,
                    });
                }
                window.count += 1;
            },
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        reset_at: now + self.config.window,
                    },
                );
            },
        }
        Ok(())
    }

    /// Returns the call count in the current window for `key`.
    #[must_use]
    pub fn count(&self, key: &str) -> Option<u32> {
        self.windows
            .lock()
            .ok()
            .and_then(|w| w.get(key).map(|window| window.count))
    }

    /// Number of tracked windows.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map_or(0, |w| w.len())
    }

    /// Deletes expired windows, returning how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Deletes windows expired at `now`.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let Ok(mut windows) = self.windows.lock() else {
            return 0;
        };
        let before = windows.len();
        windows.retain(|_, window| window.reset_at >= now);
        before - windows.len()
    }

    /// Starts the periodic sweep on the current runtime.
    ///
    /// The task holds a weak reference and ends once the limiter is dropped.
    /// Calling this again replaces the previous task.
    pub fn start_sweep(self: &Arc<Self>, interval: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired rate limit windows");
                }
            }
        });

        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Whether a sweep task is running.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .is_ok_and(|slot| slot.as_ref().is_some_and(|h| !h.is_finished()))
    }

    /// Cancels the sweep task.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                tracing::debug!("Stopped rate limit sweep");
            }
        }
    }

    fn lock_windows(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Window>>> {
        self.windows
            .lock()
            .map_err(|e| Error::operation("rate_limit_lock", e))
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}
