//! Policy model
//!
//! A policy is a coverage commitment against one event. Lifecycle:
//!
//! ```text
//! purchased (lockup) --now >= activation_time--> active --event triggered--> claimed
//! ```
//!
//! `is_active` flips once; `is_claimed` flips at most once.

use crate::core::math::{self, Amount, MathError};
use crate::core::time::{Timestamp, SECONDS_PER_YEAR};
use crate::models::event::EventId;
use serde::{Deserialize, Serialize};

pub type PolicyId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub holder: String,
    pub event_id: EventId,
    pub coverage: Amount,
    pub annualized_premium: Amount,
    /// Balance the holder had to show at purchase
    pub max_loss_limit: Amount,
    pub start_time: Timestamp,
    pub activation_time: Timestamp,
    pub is_active: bool,
    pub is_claimed: bool,
    /// Accrual checkpoint; set on activation
    pub last_premium_collection: Option<Timestamp>,
    /// Premiums collected into escrow, not yet distributed
    pub pending_premiums: Amount,
    /// Lifetime premiums collected from the holder
    pub premiums_paid: Amount,
}

impl Policy {
    /// Truncated per-second premium
    ///
    /// # Example
    /// ```
    /// use riskpool_core_rs::Policy;
    ///
    /// let mut policy = Policy::new(1, "HOLDER".to_string(), 1, 1_000_000, 31_536_000 * 3, 0, 0, 0);
    /// assert_eq!(policy.premium_per_second(), 3);
    /// policy.annualized_premium = 100;
    /// assert_eq!(policy.premium_per_second(), 0);
    /// ```
    pub fn premium_per_second(&self) -> Amount {
        self.annualized_premium / Amount::from(SECONDS_PER_YEAR)
    }

    /// Premium accrued over `seconds`
    pub fn accrual_for(&self, seconds: u64) -> Result<Amount, MathError> {
        math::mul(self.premium_per_second(), Amount::from(seconds))
    }

    /// Active, unclaimed: collects premiums and pays out on trigger
    pub fn is_in_force(&self) -> bool {
        self.is_active && !self.is_claimed
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PolicyId,
        holder: String,
        event_id: EventId,
        coverage: Amount,
        annualized_premium: Amount,
        max_loss_limit: Amount,
        start_time: Timestamp,
        activation_time: Timestamp,
    ) -> Self {
        Self {
            id,
            holder,
            event_id,
            coverage,
            annualized_premium,
            max_loss_limit,
            start_time,
            activation_time,
            is_active: false,
            is_claimed: false,
            last_premium_collection: None,
            pending_premiums: 0,
            premiums_paid: 0,
        }
    }
}
