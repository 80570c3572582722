//! Global reinsurance aggregate
//!
//! A cached view of pool totals used by the pricing model. It is never
//! mutated implicitly: every capital-changing operation calls
//! [`ReinsuranceState::recompute`] before committing.

use crate::core::error::PoolError;
use crate::core::math::{self, Amount, Bps, BPS};
use crate::events::EventRegistry;
use crate::pools::{CapitalPool, ReinsurancePool};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinsuranceState {
    /// Insurer collateral plus reinsurance capital
    pub total_capital: Amount,
    /// Deployable reinsurer collateral
    pub reinsurance_capital: Amount,
    /// Part of the expected loss the reinsurers would carry
    pub expected_reinsurance_loss: Amount,
    /// `sum(coverage * elr)` over untriggered events
    pub total_expected_loss: Amount,
    /// Sum of expected loss ratios over all events (bps)
    pub total_expected_loss_ratio_sum: Amount,
}

impl ReinsuranceState {
    /// Pricing inputs are usable
    pub fn is_initialized(&self) -> bool {
        self.total_capital > 0 && self.total_expected_loss_ratio_sum > 0
    }

    pub fn update_reinsurance_state(
        &mut self,
        total_capital: Amount,
        reinsurance_capital: Amount,
        expected_reinsurance_loss: Amount,
        total_expected_loss: Amount,
    ) {
        self.total_capital = total_capital;
        self.reinsurance_capital = reinsurance_capital;
        self.expected_reinsurance_loss = expected_reinsurance_loss;
        self.total_expected_loss = total_expected_loss;
    }

    /// Rebuild every field from live pool and event totals
    pub fn recompute(
        &mut self,
        capital: &CapitalPool,
        reinsurance: &ReinsurancePool,
        events: &EventRegistry,
        insurer_claim_share_bps: Bps,
    ) -> Result<(), PoolError> {
        let reinsurance_capital = reinsurance.deployable_capital()?;
        let total_capital = math::add(capital.total_collateral()?, reinsurance_capital)?;
        let total_expected_loss = events.total_expected_loss()?;
        let reinsurer_share = BPS.saturating_sub(insurer_claim_share_bps);
        let expected_reinsurance_loss =
            math::apply_bps(total_expected_loss, reinsurer_share)?.min(reinsurance_capital);

        self.update_reinsurance_state(
            total_capital,
            reinsurance_capital,
            expected_reinsurance_loss,
            total_expected_loss,
        );
        self.total_expected_loss_ratio_sum = events.expected_loss_ratio_sum()?;
        Ok(())
    }
}
