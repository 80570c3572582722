//! Peril event model
//!
//! An event is a named binary peril ("asset X drops more than 20%"). It is
//! registered once, accumulates coverage, insurer capital and premiums, and
//! may be triggered exactly once.
//!
//! State machine: `Active -> Triggered` (terminal). Nothing else.

use crate::core::math::{Amount, Bps};
use crate::core::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Monotonically increasing event identifier (starts at 1)
pub type EventId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Active,
    Triggered,
}

/// Per-event inputs of the pricing model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParameters {
    pub expected_loss_ratio_bps: Bps,
    pub total_loss_ratio_bps: Bps,
    /// Premium rate cap per unit of coverage
    pub max_premium_bps: Bps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: String,
    /// Parametric trigger level, informational for the oracle
    pub trigger_threshold_bps: Bps,
    pub is_triggered: bool,
    pub trigger_time: Option<Timestamp>,
    pub total_coverage: Amount,
    /// Lifetime premiums collected on this event
    pub total_premiums: Amount,
    /// Fallback annual premium rate per unit of coverage
    pub base_premium_bps: Bps,
    pub is_active: bool,
    /// Sum of every insurer's allocation to this event
    pub total_insurer_capital: Amount,
    /// Collected premiums awaiting distribution
    pub accumulated_premiums: Amount,
    pub last_distribution_time: Option<Timestamp>,
    /// Lifetime claim payouts
    pub total_payouts: Amount,
    pub risk: RiskParameters,
    pub created_at: Timestamp,
}

impl Event {
    pub fn status(&self) -> EventStatus {
        if self.is_triggered {
            EventStatus::Triggered
        } else {
            EventStatus::Active
        }
    }

    /// Accepting new capital, policies and premiums
    pub fn is_open(&self) -> bool {
        self.is_active && !self.is_triggered
    }
}
