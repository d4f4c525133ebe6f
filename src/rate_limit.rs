//! Fixed-window rate limiting keyed by an opaque client identifier.
//!
//! Each key gets a window that opens on its first request and closes at a
//! fixed instant. Every evaluated request counts, admitted or not, so the
//! first `max_requests` requests of a window pass and the rest are turned
//! away until the window closes.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::error::ConfigError;

pub const DEFAULT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

// Rate limit entry - tracks attempts per client key for the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_at: Instant,
}

impl RateLimitEntry {
    fn open(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_reset_at: now + window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.window_reset_at < now
    }
}

/// How many requests a key may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_requests: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Fails fast on a zero limit or a zero-length window.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        if max_requests == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroRateWindow);
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Admitted,
    /// Over the limit; the window closes in `retry_after_secs` (rounded up).
    Rejected { retry_after_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, RateLimitDecision::Admitted)
    }
}

/// In-memory store of per-key windows.
///
/// Owned by whoever wires up the server and shared by handle; nothing here
/// is global. Updates for one key happen under that key's shard lock, so
/// concurrent requests for the same key cannot both slip under the limit.
/// Counters live only in this process.
#[derive(Debug, Default)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> RateLimitDecision {
        self.check_at(key, policy, Instant::now())
    }

    /// Counts one request for `key` at `now` and decides whether it may pass.
    pub fn check_at(&self, key: &str, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
        // purge closed windows of every key before looking at this one
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry::open(now, policy.window));

        if entry.is_expired(now) {
            *entry = RateLimitEntry::open(now, policy.window);
        }

        entry.count = entry.count.saturating_add(1);

        if entry.count > policy.max_requests {
            RateLimitDecision::Rejected {
                retry_after_secs: retry_after_secs(entry.window_reset_at, now),
            }
        } else {
            RateLimitDecision::Admitted
        }
    }

    // Snapshot of a key's window, if it has one
    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn retry_after_secs(window_reset_at: Instant, now: Instant) -> u64 {
    let remaining = window_reset_at.saturating_duration_since(now);
    remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0)
}
