//! Token-bucket pacing for outbound model calls.
//!
//! Two buckets are kept: one for requests per minute and one for (estimated)
//! tokens per minute. A call proceeds once both buckets can pay for it.
//! Waiters are served in arrival order because the state lock is held across
//! the wait.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Provider ceilings. A zero limit disables that bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u32,
    /// Requests that may be issued back to back before pacing kicks in.
    pub burst: u32,
}

impl RateLimits {
    /// No pacing at all.
    pub const UNLIMITED: Self = Self {
        requests_per_minute: 0,
        tokens_per_minute: 0,
        burst: 1,
    };
}

impl Default for RateLimits {
    /// Gemini free tier: 15 RPM, 1M TPM.
    fn default() -> Self {
        Self {
            requests_per_minute: 15,
            tokens_per_minute: 1_000_000,
            burst: 1,
        }
    }
}

/// Rough token count for a prompt: one token per four characters.
pub fn estimate_tokens(text: &str) -> u32 {
    u32::try_from(text.chars().count())
        .unwrap_or(u32::MAX)
        .div_ceil(4)
}

#[derive(Debug)]
struct Bucket {
    capacity: f64,
    available: f64,
    refill_per_sec: f64,
}

impl Bucket {
    fn new(capacity: u32, per_minute: u32) -> Option<Self> {
        if per_minute == 0 {
            return None;
        }
        let capacity = f64::from(capacity.max(1));
        Some(Self {
            capacity,
            available: capacity,
            refill_per_sec: f64::from(per_minute) / 60.0,
        })
    }

    fn refill(&mut self, elapsed: Duration) {
        self.available =
            (self.available + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);
    }

    fn clamp(&self, cost: f64) -> f64 {
        cost.min(self.capacity)
    }

    fn wait_for(&self, cost: f64) -> Duration {
        let deficit = self.clamp(cost) - self.available;
        if deficit <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(deficit / self.refill_per_sec)
        }
    }

    fn take(&mut self, cost: f64) {
        self.available -= self.clamp(cost);
    }
}

#[derive(Debug)]
struct State {
    requests: Option<Bucket>,
    tokens: Option<Bucket>,
    last_refill: Instant,
}

impl State {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.last_refill = now;
        for bucket in [&mut self.requests, &mut self.tokens].into_iter().flatten() {
            bucket.refill(elapsed);
        }
    }

    fn wait_for(&self, token_cost: f64) -> Duration {
        let requests = self
            .requests
            .as_ref()
            .map_or(Duration::ZERO, |b| b.wait_for(1.0));
        let tokens = self
            .tokens
            .as_ref()
            .map_or(Duration::ZERO, |b| b.wait_for(token_cost));
        requests.max(tokens)
    }

    fn take(&mut self, token_cost: f64) {
        if let Some(b) = self.requests.as_mut() {
            b.take(1.0);
        }
        if let Some(b) = self.tokens.as_mut() {
            b.take(token_cost);
        }
    }
}

/// Shared pacing state for one upstream provider.
#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        let state = State {
            requests: Bucket::new(limits.burst, limits.requests_per_minute),
            tokens: Bucket::new(limits.tokens_per_minute, limits.tokens_per_minute),
            last_refill: Instant::now(),
        };
        Self {
            limits,
            state: Mutex::new(state),
        }
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    /// Wait until one request costing `estimated_tokens` may be sent.
    ///
    /// Returns how long the caller was held back (zero when the buckets
    /// already had capacity).
    pub async fn acquire(&self, estimated_tokens: u32) -> Duration {
        let cost = f64::from(estimated_tokens);
        let mut state = self.state.lock().await;
        state.refill();

        let wait = state.wait_for(cost);
        if !wait.is_zero() {
            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                estimated_tokens,
                "pacing model call"
            );
            tokio::time::sleep(wait).await;
            state.refill();
        }

        state.take(cost);
        wait
    }
}
