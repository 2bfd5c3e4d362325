//! Per-address limiter for bind attempts.
//!
//! Fixed window: the first attempt from an address opens a window, and at
//! most `max_attempts` are admitted until it expires. Rejected attempts
//! still count against the window.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use livecast_core::config::LimitSettings;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    attempts: u32,
}

#[derive(Debug, Clone)]
pub struct ConnectAttemptLimiter {
    windows: Arc<DashMap<IpAddr, Window>>,
    max_attempts: u32,
    window: Duration,
}

impl ConnectAttemptLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            max_attempts,
            window,
        }
    }

    pub fn from_settings(limits: &LimitSettings) -> Self {
        Self::new(limits.connect_max_attempts, limits.connect_window())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record an attempt from `ip`. Returns false once the address is over
    /// its budget for the current window.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    pub fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            attempts: 0,
        });
        let window = entry.value_mut();
        if now.saturating_duration_since(window.started) >= self.window {
            window.started = now;
            window.attempts = 0;
        }
        window.attempts = window.attempts.saturating_add(1);

        if window.attempts > self.max_attempts {
            tracing::warn!(%ip, attempts = window.attempts, "bind attempts over limit");
            false
        } else {
            tracing::debug!(%ip, attempts = window.attempts, max = self.max_attempts, "bind attempt admitted");
            true
        }
    }

    /// Forget windows that expired before `now`.
    pub fn prune(&self, now: Instant) {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, "pruned expired attempt windows");
        }
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}
