//! Time management for the ledger
//!
//! The ledger never samples wall-clock time. Every mutating operation receives
//! the current timestamp (unix seconds) from its caller, and the clock only
//! checks that those timestamps never move backwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unix timestamp in seconds
pub type Timestamp = u64;

pub const SECONDS_PER_DAY: u64 = 24 * 3600;

/// Premium accrual year (365 days, no leap handling)
pub const SECONDS_PER_YEAR: u64 = 365 * SECONDS_PER_DAY;

/// Default lockup between purchase and activation of a policy
pub const DEFAULT_LOCKUP_PERIOD: u64 = 7 * SECONDS_PER_DAY;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    #[error("Timestamp went backwards: last seen {last}, got {now}")]
    TimeWentBackwards { last: Timestamp, now: Timestamp },
}

/// Monotonic view of caller-supplied time
///
/// # Example
/// ```
/// use riskpool_core_rs::LedgerClock;
///
/// let mut clock = LedgerClock::new();
/// assert_eq!(clock.last_seen(), None);
///
/// clock.observe(1_000).unwrap();
/// clock.observe(1_000).unwrap(); // same instant is fine
/// assert!(clock.observe(999).is_err());
/// assert_eq!(clock.last_seen(), Some(1_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerClock {
    /// Latest timestamp accepted by a committed operation
    last_seen: Option<Timestamp>,
}

impl LedgerClock {
    pub fn new() -> Self {
        Self { last_seen: None }
    }

    /// Restore a clock from a checkpoint
    pub fn from_last_seen(last_seen: Option<Timestamp>) -> Self {
        Self { last_seen }
    }

    /// Accept `now` if it is not earlier than the latest accepted timestamp
    pub fn observe(&mut self, now: Timestamp) -> Result<Timestamp, ClockError> {
        if let Some(last) = self.last_seen {
            if now < last {
                return Err(ClockError::TimeWentBackwards { last, now });
            }
        }
        self.last_seen = Some(now);
        Ok(now)
    }

    /// Latest accepted timestamp, if any operation ran yet
    pub fn last_seen(&self) -> Option<Timestamp> {
        self.last_seen
    }
}

/// Seconds elapsed from `since` to `now`, saturating at zero
///
/// # Example
/// ```
/// use riskpool_core_rs::core::time::elapsed;
///
/// assert_eq!(elapsed(100, 160), 60);
/// assert_eq!(elapsed(160, 100), 0);
/// ```
pub fn elapsed(since: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_constant() {
        assert_eq!(SECONDS_PER_YEAR, 31_536_000);
        assert_eq!(DEFAULT_LOCKUP_PERIOD, 604_800);
    }

    #[test]
    fn test_clock_rejects_regression() {
        let mut clock = LedgerClock::new();
        clock.observe(50).unwrap();
        let err = clock.observe(49).unwrap_err();
        assert_eq!(err, ClockError::TimeWentBackwards { last: 50, now: 49 });
        // rejected timestamp is not recorded
        assert_eq!(clock.last_seen(), Some(50));
    }
}
