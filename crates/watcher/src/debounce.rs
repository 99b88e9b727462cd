//! Growth debouncing for tracked files
//!
//! Decides whether a write notification is worth a re-read attempt.
//! Checks run in a fixed order: cooldown since the last attempt, unchanged
//! size, shrinkage (truncation), then minimum growth.

use std::time::{Duration, Instant};

/// Default minimum growth before a re-read (5 KiB)
pub const DEFAULT_MIN_GROWTH: u64 = 5 * 1024;

/// Default cooldown between re-read attempts
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);

/// Why a write notification was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Last attempt was too recent
    Cooldown,
    /// Size did not change
    Unchanged,
    /// Grew, but by less than the threshold
    BelowThreshold { growth: u64 },
    /// Worth a re-read, but the previous `Try` is still unanswered
    AwaitingEof,
}

/// Outcome of a write notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDecision {
    Ignore(IgnoreReason),
    /// File shrank; its session must be torn down, never re-read
    Truncated,
    /// Ask the session to read the new bytes
    Reread { growth: u64 },
}

/// Cooldown and growth threshold applied to every tracked file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthPolicy {
    /// Minimum byte growth that triggers a re-read
    pub min_growth: u64,
    /// Minimum time between re-read attempts for one file
    pub cooldown: Duration,
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self {
            min_growth: DEFAULT_MIN_GROWTH,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl GrowthPolicy {
    pub fn new(min_growth: u64, cooldown: Duration) -> Self {
        Self {
            min_growth,
            cooldown,
        }
    }

    /// Decide what a newly observed size means for a tracked file
    pub fn decide(&self, last_size: u64, last_try: Instant, size: u64, now: Instant) -> WriteDecision {
        if now.saturating_duration_since(last_try) < self.cooldown {
            return WriteDecision::Ignore(IgnoreReason::Cooldown);
        }
        if size == last_size {
            return WriteDecision::Ignore(IgnoreReason::Unchanged);
        }
        if size < last_size {
            return WriteDecision::Truncated;
        }
        let growth = size - last_size;
        if growth < self.min_growth {
            return WriteDecision::Ignore(IgnoreReason::BelowThreshold { growth });
        }
        WriteDecision::Reread { growth }
    }
}
