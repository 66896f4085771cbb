//! Per-IP fixed-window request counter.
//!
//! Time is always passed in by the caller so the window arithmetic can be
//! driven by a fake clock in tests.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: TimeDelta },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Debug)]
struct Window {
    started: DateTime<Utc>,
    count: u32,
}

/// Shared handle; clones point at the same counters.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    max_requests: u32,
    window: TimeDelta,
    counters: DashMap<String, Window>,
}

impl RateLimiter {
    /// `max_requests = 0` disables the limiter.
    pub fn new(max_requests: u32, window: TimeDelta) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                max_requests,
                window,
                counters: DashMap::new(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.max_requests > 0
    }

    pub fn window(&self) -> TimeDelta {
        self.inner.window
    }

    /// Counts one request from `ip` at `now` and decides whether it may pass.
    /// Denied requests do not extend the window.
    pub fn check(&self, ip: &str, now: DateTime<Utc>) -> RateDecision {
        if !self.is_enabled() {
            return RateDecision::Allowed {
                remaining: u32::MAX,
            };
        }

        let mut entry = self.inner.counters.entry(ip.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        let window = entry.value_mut();

        if now - window.started >= self.inner.window {
            window.started = now;
            window.count = 0;
        }

        if window.count < self.inner.max_requests {
            window.count += 1;
            RateDecision::Allowed {
                remaining: self.inner.max_requests - window.count,
            }
        } else {
            RateDecision::Limited {
                retry_after: window.started + self.inner.window - now,
            }
        }
    }

    /// Drops counters whose window has elapsed. Returns how many were removed.
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let before = self.inner.counters.len();
        let window = self.inner.window;
        self.inner
            .counters
            .retain(|_, state| now - state.started < window);
        before.saturating_sub(self.inner.counters.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.inner.counters.len()
    }
}
