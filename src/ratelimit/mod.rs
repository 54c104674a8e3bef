//! Per-client admission control.
//!
//! [`AdmissionControl`] is the seam; [`InMemoryRateLimiter`] is the single-instance
//! implementation. A fixed window per client key: the first call (or the first call after the
//! window expired) opens a new window, later calls are admitted until the counter reaches the
//! maximum.
//!
//! Buckets live in a bounded `moka` cache and are evicted after one idle window, so distinct
//! client keys cannot grow the map without limit.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::HeaderMap;
use moka::sync::Cache;
use parking_lot::Mutex;

use crate::config::Config;
use crate::constants::{
    DEFAULT_RATE_LIMIT_MAX, DEFAULT_RATE_LIMIT_MAX_KEYS, DEFAULT_RATE_LIMIT_WINDOW_SECS,
    UNKNOWN_CLIENT_KEY,
};
use crate::hashing::hash_client_key;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const REAL_IP_HEADER: &str = "x-real-ip";

/// Decides whether a client may issue another validation now.
#[async_trait]
pub trait AdmissionControl: Send + Sync {
    /// Returns `true` and records the call when admitted.
    async fn check_admission(&self, client_key: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Upper bound on tracked client keys.
    pub max_keys: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            max_keys: DEFAULT_RATE_LIMIT_MAX_KEYS,
        }
    }
}

impl RateLimitConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_requests: config.rate_limit_max,
            window: config.rate_limit_window,
            max_keys: config.rate_limit_max_keys,
        }
    }
}

/// Counter state of one client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_reset: Instant,
}

impl RateLimitRecord {
    fn open(now: Instant, window: Duration) -> Self {
        Self {
            count: 0,
            window_reset: now + window,
        }
    }
}

/// Process-local limiter. Correct for a single instance only; replicas each keep their own
/// buckets.
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    buckets: Cache<u64, Arc<Mutex<RateLimitRecord>>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let buckets = Cache::builder()
            .max_capacity(config.max_keys)
            .time_to_idle(config.window)
            .build();
        Self { config, buckets }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// [`AdmissionControl::check_admission`] with an explicit clock.
    pub fn check_admission_at(&self, client_key: &str, now: Instant) -> bool {
        let window = self.config.window;
        let bucket = self
            .buckets
            .get_with(hash_client_key(client_key), || {
                Arc::new(Mutex::new(RateLimitRecord::open(now, window)))
            });

        let mut record = bucket.lock();
        if now > record.window_reset {
            *record = RateLimitRecord::open(now, window);
        }
        if record.count >= self.config.max_requests {
            return false;
        }
        record.count += 1;
        true
    }

    /// Current record of `client_key`, if tracked.
    pub fn record(&self, client_key: &str) -> Option<RateLimitRecord> {
        self.buckets
            .get(&hash_client_key(client_key))
            .map(|bucket| *bucket.lock())
    }

    /// Number of tracked client keys after pending evictions ran.
    pub fn tracked_keys(&self) -> u64 {
        self.buckets.run_pending_tasks();
        self.buckets.entry_count()
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl std::fmt::Debug for InMemoryRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AdmissionControl for InMemoryRateLimiter {
    async fn check_admission(&self, client_key: &str) -> bool {
        self.check_admission_at(client_key, Instant::now())
    }
}

/// First `X-Forwarded-For` entry, else `X-Real-IP`, else `"unknown"`. Unidentified clients
/// share one bucket.
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = || {
        headers
            .get(REAL_IP_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(UNKNOWN_CLIENT_KEY)
        .to_string()
}
