use crate::error::GatewayError;
use crate::util::create_timestamp;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{event, Level};

pub const DEFAULT_MAX_REQUESTS: u32 = 100;
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Call bookkeeping for one caller identity.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitState {
    pub identity: String,
    pub window_start: u64,
    pub count: u32,
}

/// Fixed-window throttle keyed by caller identity (peer id on the socket
/// transport, remote ip over http).
///
/// The first call from an identity opens its window. Every call bumps the
/// counter and is rejected once the counter passes `max`; the counter is reset
/// when a call arrives `window_ms` or more after the window opened. Entries
/// live for the lifetime of the process.
#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window_ms: u64,
    states: Mutex<HashMap<String, RateLimitState>>,
}

impl RateLimiter {
    pub fn new(max: u32, window_ms: u64) -> Self {
        RateLimiter {
            max,
            window_ms,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_max(&self) -> u32 {
        self.max
    }

    pub fn get_window_ms(&self) -> u64 {
        self.window_ms
    }

    pub async fn limiter(&self, identity: &str) -> Result<(), GatewayError> {
        self.limiter_at(identity, create_timestamp()).await
    }

    pub async fn limiter_at(&self, identity: &str, now: u64) -> Result<(), GatewayError> {
        let mut states = self.states.lock().await;
        let state = states
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitState {
                identity: identity.to_string(),
                window_start: now,
                count: 0,
            });

        if now.saturating_sub(state.window_start) >= self.window_ms {
            state.window_start = now;
            state.count = 0;
        }

        state.count = state.count.saturating_add(1);
        if state.count > self.max {
            // keep the counter pinned so it never runs past the budget
            state.count = self.max;
            event!(Level::WARN, "rate limit exceeded for {}", identity);
            return Err(GatewayError::RateLimitExceeded {
                identity: identity.to_string(),
            });
        }
        Ok(())
    }

    pub async fn get_state(&self, identity: &str) -> Option<RateLimitState> {
        self.states.lock().await.get(identity).cloned()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        RateLimiter::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_identity_starts_at_zero() {
        let rate_limiter = RateLimiter::default();
        assert_eq!(rate_limiter.get_state("QmPeer").await, None);

        rate_limiter.limiter_at("QmPeer", 1_000).await.unwrap();
        let state = rate_limiter.get_state("QmPeer").await.unwrap();
        assert_eq!(state.count, 1);
        assert_eq!(state.window_start, 1_000);
    }

    #[tokio::test]
    async fn rejects_call_over_max_within_window() {
        let rate_limiter = RateLimiter::new(100, 60_000);
        for i in 0..100 {
            assert!(rate_limiter.limiter_at("QmPeer", 1_000 + i).await.is_ok());
        }
        let result = rate_limiter.limiter_at("QmPeer", 2_000).await;
        assert_eq!(
            result,
            Err(GatewayError::RateLimitExceeded {
                identity: String::from("QmPeer")
            })
        );
        assert_eq!(rate_limiter.get_state("QmPeer").await.unwrap().count, 100);
    }

    #[tokio::test]
    async fn identities_are_counted_separately() {
        let rate_limiter = RateLimiter::new(1, 60_000);
        assert!(rate_limiter.limiter_at("QmAlice", 0).await.is_ok());
        assert!(rate_limiter.limiter_at("QmBob", 0).await.is_ok());
        assert!(rate_limiter.limiter_at("QmAlice", 1).await.is_err());
        assert!(rate_limiter.limiter_at("QmBob", 1).await.is_err());
    }

    #[tokio::test]
    async fn window_reset_allows_calls_again() {
        let rate_limiter = RateLimiter::new(2, 1_000);
        assert!(rate_limiter.limiter_at("QmPeer", 0).await.is_ok());
        assert!(rate_limiter.limiter_at("QmPeer", 10).await.is_ok());
        assert!(rate_limiter.limiter_at("QmPeer", 999).await.is_err());

        assert!(rate_limiter.limiter_at("QmPeer", 1_000).await.is_ok());
        let state = rate_limiter.get_state("QmPeer").await.unwrap();
        assert_eq!(state.window_start, 1_000);
        assert_eq!(state.count, 1);
    }
}
