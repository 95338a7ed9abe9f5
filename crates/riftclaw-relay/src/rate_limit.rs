//! Per-connection sliding-window request budget.
//!
//! Each connection keeps the timestamps of its accepted requests inside
//! the trailing window. A check prunes expired timestamps, then allows the
//! request only if fewer than `max_requests` remain. Denied requests are
//! not recorded, so a flood of rejected frames never extends the window.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use riftclaw_types::ConnectionId;

use crate::config::RateLimitConfig;

/// Sliding-window limiter keyed by connection.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    history: HashMap<ConnectionId, VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window`.
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            history: HashMap::new(),
        }
    }

    /// Create a limiter from config.
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.window(), config.max_requests)
    }

    /// Check and record a request arriving now.
    pub fn check(&mut self, id: ConnectionId) -> bool {
        self.check_at(id, Instant::now())
    }

    /// Check and record a request arriving at `now`.
    pub fn check_at(&mut self, id: ConnectionId, now: Instant) -> bool {
        let recent = self.history.entry(id).or_default();
        while recent
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            recent.pop_front();
        }

        if recent.len() >= self.max_requests {
            return false;
        }
        recent.push_back(now);
        true
    }

    /// Discard a connection's history.
    pub fn remove(&mut self, id: ConnectionId) {
        self.history.remove(&id);
    }

    /// Number of connections with recorded history.
    pub fn tracked(&self) -> usize {
        self.history.len()
    }
}
