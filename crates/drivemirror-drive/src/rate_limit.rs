//! Rate limiting, adaptive throttling and retry backoff for the Drive API
//!
//! ## Architecture
//!
//! - [`TokenBucket`]: token bucket for one endpoint category
//! - [`AdaptiveRateLimiter`]: one bucket per category, halving capacity on
//!   throttle and recovering it gradually on success
//! - [`RetryPolicy`]: bounded exponential backoff for transient failures
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivemirror_drive::rate_limit::{AdaptiveRateLimiter, RateLimitConfig};
//!
//! # async fn example() {
//! let limiter = AdaptiveRateLimiter::new(RateLimitConfig::default());
//! limiter.acquire("list").await;
//! // ... make API call ...
//! limiter.on_success("list");
//! # }
//! ```

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use drivemirror_core::config::RateLimitingConfig;
use tracing::{debug, info, warn};

/// Consecutive successes needed before capacity grows back by 5%
const RECOVERY_INTERVAL: u64 = 100;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// TokenBucket
// ============================================================================

#[derive(Debug)]
struct BucketState {
    /// Available tokens (fractional for smooth refill)
    tokens: f64,
    last_refill: Instant,
    /// Capacity after throttle reductions
    effective_capacity: u32,
    /// Successes since the last throttle
    successes: u64,
}

impl BucketState {
    fn refill(&mut self, refill_rate: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * refill_rate).min(self.effective_capacity as f64);
            self.last_refill = now;
        }
    }
}

/// Token bucket rate limiter for a single endpoint category.
///
/// Tokens are consumed on each request and refilled at a constant rate.
/// When the bucket is empty, callers wait for refill.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    /// Tokens added per second
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket.
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: capacity as f64,
                last_refill: Instant::now(),
                effective_capacity: capacity,
                successes: 0,
            }),
        }
    }

    /// Takes one token if available.
    pub fn try_acquire(&self) -> bool {
        let mut state = lock(&self.state);
        state.refill(self.refill_rate);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Estimated wait until one token is available; zero if one already is.
    pub fn time_until_available(&self) -> Duration {
        let mut state = lock(&self.state);
        state.refill(self.refill_rate);
        if state.tokens >= 1.0 {
            Duration::ZERO
        } else if self.refill_rate > 0.0 {
            Duration::from_secs_f64((1.0 - state.tokens) / self.refill_rate)
        } else {
            Duration::MAX
        }
    }

    pub fn available_tokens(&self) -> f64 {
        let mut state = lock(&self.state);
        state.refill(self.refill_rate);
        state.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn effective_capacity(&self) -> u32 {
        lock(&self.state).effective_capacity
    }

    /// Records a success; every 100 in a row grow capacity by 5% up to the original.
    pub fn on_success(&self) {
        let mut state = lock(&self.state);
        state.successes += 1;
        if state.successes % RECOVERY_INTERVAL == 0 && state.effective_capacity < self.capacity {
            let increase = ((state.effective_capacity as f64 * 0.05) as u32).max(1);
            let new_capacity = (state.effective_capacity + increase).min(self.capacity);
            debug!(
                old_capacity = state.effective_capacity,
                new_capacity, "Adaptive recovery: increasing bucket capacity"
            );
            state.effective_capacity = new_capacity;
        }
    }

    /// Records a throttle response: halves capacity (minimum 1) and resets the success streak.
    pub fn on_throttle(&self) {
        let mut state = lock(&self.state);
        let old = state.effective_capacity;
        state.effective_capacity = (old / 2).max(1);
        state.tokens = state.tokens.min(state.effective_capacity as f64);
        state.successes = 0;
        warn!(
            old_capacity = old,
            new_capacity = state.effective_capacity,
            "Throttle detected: reducing bucket capacity by 50%"
        );
    }
}

// ============================================================================
// RateLimitConfig
// ============================================================================

/// Bucket parameters for the adaptive rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Default bucket capacity (tokens)
    pub default_capacity: u32,
    /// Default refill rate (tokens per second)
    pub default_refill_rate: f64,
    /// Per-category overrides: (capacity, refill_rate)
    pub endpoint_overrides: HashMap<String, (u32, f64)>,
}

impl Default for RateLimitConfig {
    /// Drive allows roughly 12 000 queries per minute per project, but far
    /// fewer per user; start at 10/s and let throttling adapt.
    fn default() -> Self {
        Self::from(&RateLimitingConfig::default())
    }
}

impl From<&RateLimitingConfig> for RateLimitConfig {
    fn from(config: &RateLimitingConfig) -> Self {
        let mut overrides = HashMap::new();
        // Mutations are slower server-side; give them half the read budget.
        let write_rate = config.requests_per_second / 2.0;
        let write_burst = (config.burst / 2).max(1);
        overrides.insert("create".to_string(), (write_burst, write_rate));
        overrides.insert("copy".to_string(), (write_burst, write_rate));

        Self {
            default_capacity: config.burst,
            default_refill_rate: config.requests_per_second,
            endpoint_overrides: overrides,
        }
    }
}

// ============================================================================
// AdaptiveRateLimiter
// ============================================================================

/// Adaptive rate limiter managing one token bucket per endpoint category.
///
/// Thread-safe and designed to be shared via `Arc<AdaptiveRateLimiter>`.
pub struct AdaptiveRateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

impl std::fmt::Debug for AdaptiveRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveRateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl AdaptiveRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn with_bucket<F, R>(&self, endpoint: &str, f: F) -> R
    where
        F: FnOnce(&TokenBucket) -> R,
    {
        let mut buckets = lock(&self.buckets);
        let bucket = buckets.entry(endpoint.to_string()).or_insert_with(|| {
            let (capacity, refill_rate) = self
                .config
                .endpoint_overrides
                .get(endpoint)
                .copied()
                .unwrap_or((self.config.default_capacity, self.config.default_refill_rate));
            debug!(
                endpoint,
                capacity, refill_rate, "Creating new token bucket for endpoint"
            );
            TokenBucket::new(capacity, refill_rate)
        });
        f(bucket)
    }

    /// Waits until a token for `endpoint` is available and takes it.
    pub async fn acquire(&self, endpoint: &str) {
        loop {
            if self.with_bucket(endpoint, TokenBucket::try_acquire) {
                return;
            }
            let wait = self
                .with_bucket(endpoint, TokenBucket::time_until_available)
                .max(Duration::from_millis(10));
            debug!(
                endpoint,
                wait_ms = wait.as_millis(),
                "No tokens available, waiting for refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    pub fn on_success(&self, endpoint: &str) {
        self.with_bucket(endpoint, TokenBucket::on_success);
    }

    pub fn on_throttle(&self, endpoint: &str) {
        info!(endpoint, "Recording throttle event for endpoint");
        self.with_bucket(endpoint, TokenBucket::on_throttle);
    }

    /// Effective capacity for an endpoint, `None` until it is first used.
    pub fn effective_capacity(&self, endpoint: &str) -> Option<u32> {
        lock(&self.buckets)
            .get(endpoint)
            .map(TokenBucket::effective_capacity)
    }
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// Bounded exponential backoff for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Wait before retry number `attempt`, preferring the server's hint.
    ///
    /// Either way the result never exceeds `max_delay`.
    pub fn backoff(&self, attempt: u32, server_hint: Option<Duration>) -> Duration {
        server_hint
            .unwrap_or_else(|| self.delay(attempt))
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RateLimitingConfig::default())
    }
}

impl From<&RateLimitingConfig> for RetryPolicy {
    fn from(config: &RateLimitingConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

// ============================================================================
// Retry-After header parsing
// ============================================================================

/// Longest Retry-After the client will accept from a server
const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Parses a Retry-After header value.
///
/// Accepts integer seconds (`"30"`) or an HTTP-date
/// (`"Fri, 31 Dec 2025 23:59:59 GMT"`). Waits of more than an hour, dates in
/// the past and unparseable values yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        if seconds <= MAX_RETRY_AFTER_SECS {
            return Some(Duration::from_secs(seconds));
        }
        warn!(value, "Retry-After exceeds one hour, ignoring it");
        return None;
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let diff = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(secs) = u64::try_from(diff.num_seconds()) {
            if (1..=MAX_RETRY_AFTER_SECS).contains(&secs) {
                return Some(Duration::from_secs(secs));
            }
        }
    }

    warn!(value, "Could not parse Retry-After header");
    None
}
