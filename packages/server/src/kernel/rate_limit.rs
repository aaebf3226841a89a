//! Sliding-window rate limiting behind an injected interface.
//!
//! The limiter is the only shared mutable state between request workers, so
//! it lives behind a trait: the in-memory map below is correct for a
//! single-instance deployment; multi-instance deployments swap in an
//! implementation backed by a shared atomic store.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::common::ApiConfigId;
use crate::domains::api_config::RateLimitSettings;

/// What a request is counted against: its source IP (global fallback) or
/// the API configuration it authenticated with (per-key override).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateKey {
    Ip(IpAddr),
    Config(ApiConfigId),
}

pub trait RateLimiter: Send + Sync {
    /// Check-and-record: returns `true` and counts the request when it is
    /// within the policy, `false` when the window is exhausted.
    fn check(&self, key: RateKey, policy: &RateLimitSettings, now: DateTime<Utc>) -> bool;
}

/// Process-local sliding window limiter.
pub struct InMemoryRateLimiter {
    hits: Mutex<HashMap<RateKey, VecDeque<DateTime<Utc>>>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self {
            hits: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: RateKey, policy: &RateLimitSettings, now: DateTime<Utc>) -> bool {
        if !policy.enabled {
            return true;
        }

        let mut hits = self.hits.lock().expect("rate limiter lock poisoned");
        let window = hits.entry(key).or_default();
        let cutoff = now - Duration::seconds(policy.window_seconds);

        while window.front().is_some_and(|&t| t <= cutoff) {
            window.pop_front();
        }

        if window.len() >= policy.max_per_window {
            warn!(?key, "rate limit exceeded");
            return false;
        }

        window.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> RateLimitSettings {
        RateLimitSettings {
            enabled: true,
            max_per_window: 60,
            window_seconds: 60,
        }
    }

    fn at(seconds: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds as i64)
    }

    fn ip_key() -> RateKey {
        RateKey::Ip("10.1.2.3".parse().unwrap())
    }

    #[test]
    fn sixty_first_request_in_window_is_rejected() {
        let limiter = InMemoryRateLimiter::new();
        let policy = policy();

        for i in 0..60 {
            assert!(limiter.check(ip_key(), &policy, at(i)));
        }
        assert!(!limiter.check(ip_key(), &policy, at(59)));
    }

    #[test]
    fn requests_succeed_again_after_window_passes() {
        let limiter = InMemoryRateLimiter::new();
        let policy = policy();

        for i in 0..60 {
            assert!(limiter.check(ip_key(), &policy, at(i)));
        }
        assert!(!limiter.check(ip_key(), &policy, at(59)));

        // 61 seconds after the first hit, the first slot has slid out
        assert!(limiter.check(ip_key(), &policy, at(61)));
    }

    #[test]
    fn disabled_policy_always_allows() {
        let limiter = InMemoryRateLimiter::new();
        let policy = RateLimitSettings {
            enabled: false,
            max_per_window: 1,
            window_seconds: 60,
        };

        for i in 0..100 {
            assert!(limiter.check(ip_key(), &policy, at(i % 10)));
        }
    }

    #[test]
    fn keys_are_tracked_independently() {
        let limiter = InMemoryRateLimiter::new();
        let policy = RateLimitSettings {
            enabled: true,
            max_per_window: 1,
            window_seconds: 60,
        };

        assert!(limiter.check(ip_key(), &policy, at(0)));
        assert!(!limiter.check(ip_key(), &policy, at(1)));
        assert!(limiter.check(RateKey::Config(ApiConfigId::new()), &policy, at(1)));
    }
}
