//! Risk pricing
//!
//! [`RiskPricingEngine`] combines the closed-form [`model`] with the cached
//! [`ReinsuranceState`] to price policies and split earned premiums.
//!
//! # Quote
//!
//! For an event with insurer capital `C` and notional `N` (its total
//! coverage, or `C` before the first policy):
//!
//! ```text
//! annualized_premium = coverage * M / N      (capped at max_premium_bps)
//! ```
//!
//! The rate `M / N` depends only on event and pool state, so premiums grow
//! strictly with coverage. When the risk state is uninitialized the event's
//! base premium rate applies instead.

pub mod model;
pub mod state;

pub use model::ProbabilitySolution;
pub use state::ReinsuranceState;

use crate::core::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::math::{self, Amount, Bps};
use crate::events::EventRegistry;
use crate::models::event::Event;
use crate::pools::{CapitalPool, ReinsurancePool};
use serde::{Deserialize, Serialize};

/// Event-level outputs of the risk model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPricing {
    pub insurer_capital: Amount,
    pub notional: Amount,
    pub beta_bps: Amount,
    pub alpha_bps: Amount,
    pub probability_bps: Amount,
    pub max_premium: Amount,
}

/// Annualized premium for a prospective policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumQuote {
    pub coverage: Amount,
    pub annualized_premium: Amount,
    /// `None` when the base premium fallback was used
    pub pricing: Option<EventPricing>,
}

/// Split of a distributable premium amount between the pools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumSplit {
    pub insurer_share: Amount,
    pub reinsurer_share: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskPricingEngine {
    risk_loading_bps: Bps,
    state: ReinsuranceState,
}

impl RiskPricingEngine {
    pub fn new(risk_loading_bps: Bps) -> Self {
        Self {
            risk_loading_bps,
            state: ReinsuranceState::default(),
        }
    }

    pub fn with_state(risk_loading_bps: Bps, state: ReinsuranceState) -> Self {
        Self {
            risk_loading_bps,
            state,
        }
    }

    pub fn state(&self) -> &ReinsuranceState {
        &self.state
    }

    pub fn recompute(
        &mut self,
        capital: &CapitalPool,
        reinsurance: &ReinsurancePool,
        events: &EventRegistry,
        config: &PoolConfig,
    ) -> Result<(), PoolError> {
        self.state
            .recompute(capital, reinsurance, events, config.insurer_claim_share_bps)?;
        tracing::debug!(
            total_capital = %self.state.total_capital,
            reinsurance_capital = %self.state.reinsurance_capital,
            total_expected_loss = %self.state.total_expected_loss,
            "Risk state recomputed"
        );
        Ok(())
    }

    /// Run the risk model for `event`
    ///
    /// Returns `None` when the model has no usable inputs: risk state
    /// uninitialized or no insurer capital on the event.
    pub fn price_event(&self, event: &Event) -> Result<Option<EventPricing>, PoolError> {
        let insurer_capital = event.total_insurer_capital;
        if !self.state.is_initialized() || insurer_capital == 0 {
            return Ok(None);
        }
        let notional = if event.total_coverage > 0 {
            event.total_coverage
        } else {
            insurer_capital
        };

        let beta_bps = model::beta(
            insurer_capital,
            notional,
            self.state.total_expected_loss_ratio_sum,
            self.risk_loading_bps,
        )?;
        let solution = model::solve_event_probability_and_max_premium(
            insurer_capital,
            notional,
            beta_bps,
            Amount::from(event.risk.expected_loss_ratio_bps),
            Amount::from(event.risk.total_loss_ratio_bps),
            self.state.reinsurance_capital,
            self.state.total_capital,
        )?;

        Ok(Some(EventPricing {
            insurer_capital,
            notional,
            beta_bps,
            alpha_bps: solution.alpha_bps,
            probability_bps: solution.probability_bps,
            max_premium: solution.max_premium,
        }))
    }

    pub fn quote(&self, event: &Event, coverage: Amount) -> Result<PremiumQuote, PoolError> {
        let pricing = self.price_event(event)?;
        let annualized_premium = match &pricing {
            Some(p) => {
                let modelled = math::mul_div(coverage, p.max_premium, p.notional)?;
                let cap = math::apply_bps(coverage, event.risk.max_premium_bps)?;
                modelled.min(cap)
            }
            None => math::apply_bps(coverage, event.base_premium_bps)?,
        };
        Ok(PremiumQuote {
            coverage,
            annualized_premium,
            pricing,
        })
    }

    /// Split `amount` into insurer and reinsurer shares
    ///
    /// The insurer share is the shared-risk premium; the remainder goes to
    /// reinsurers only while reinsurance capital exists. Without insurer
    /// capital on the event everything goes to reinsurers, and with neither
    /// both shares are zero and the caller books `amount` as protocol fees.
    pub fn split_premiums(&self, event: &Event, amount: Amount) -> Result<PremiumSplit, PoolError> {
        let has_reinsurance = self.state.reinsurance_capital > 0;
        let split = match self.price_event(event)? {
            Some(pricing) => {
                let insurer_share = if has_reinsurance {
                    model::shared_risk_premium(
                        pricing.beta_bps,
                        self.state.reinsurance_capital,
                        self.state.total_capital,
                        amount,
                    )?
                } else {
                    amount
                };
                PremiumSplit {
                    insurer_share,
                    reinsurer_share: amount - insurer_share,
                }
            }
            None if event.total_insurer_capital == 0 && has_reinsurance => PremiumSplit {
                insurer_share: 0,
                reinsurer_share: amount,
            },
            None if event.total_insurer_capital > 0 => PremiumSplit {
                insurer_share: amount,
                reinsurer_share: 0,
            },
            None => {
                if amount > 0 {
                    tracing::warn!(
                        event_id = event.id,
                        amount = %amount,
                        "No capital backs event; premiums go to protocol fees"
                    );
                }
                PremiumSplit::default()
            }
        };
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::RiskParameters;

    fn event(insurer_capital: Amount, coverage: Amount) -> Event {
        Event {
            id: 1,
            name: "E".to_string(),
            description: String::new(),
            trigger_threshold_bps: 2_000,
            is_triggered: false,
            trigger_time: None,
            total_coverage: coverage,
            total_premiums: 0,
            base_premium_bps: 500,
            is_active: true,
            total_insurer_capital: insurer_capital,
            accumulated_premiums: 0,
            last_distribution_time: None,
            total_payouts: 0,
            risk: RiskParameters {
                expected_loss_ratio_bps: 500,
                total_loss_ratio_bps: 15_000,
                max_premium_bps: 5_000,
            },
            created_at: 0,
        }
    }

    fn engine(total_capital: Amount, reinsurance_capital: Amount) -> RiskPricingEngine {
        RiskPricingEngine::with_state(
            500,
            ReinsuranceState {
                total_capital,
                reinsurance_capital,
                expected_reinsurance_loss: 0,
                total_expected_loss: 0,
                total_expected_loss_ratio_sum: 500,
            },
        )
    }

    #[test]
    fn test_uninitialized_uses_base_premium() {
        let pricing = RiskPricingEngine::new(500);
        let quote = pricing.quote(&event(10_000, 0), 5_000).unwrap();
        assert_eq!(quote.annualized_premium, 250);
        assert!(quote.pricing.is_none());
    }

    #[test]
    fn test_modelled_quote() {
        let pricing = engine(10_000_000_000, 0);
        let quote = pricing.quote(&event(10_000_000_000, 0), 5_000_000_000).unwrap();
        // M = 15% of capital, N = capital
        assert_eq!(quote.annualized_premium, 750_000_000);
        assert_eq!(quote.pricing.unwrap().probability_bps, 1_000);
    }

    #[test]
    fn test_quote_capped_by_max_premium() {
        let pricing = engine(1_000, 0);
        let mut e = event(1_000, 0);
        e.risk.max_premium_bps = 100;
        let quote = pricing.quote(&e, 1_000).unwrap();
        assert_eq!(quote.annualized_premium, 10);
    }

    #[test]
    fn test_split_without_reinsurance_goes_to_insurers() {
        let pricing = engine(10_000, 0);
        let split = pricing.split_premiums(&event(10_000, 10_000), 999).unwrap();
        assert_eq!(split.insurer_share, 999);
        assert_eq!(split.reinsurer_share, 0);
    }

    #[test]
    fn test_split_with_reinsurance() {
        let pricing = engine(20_000, 10_000);
        let split = pricing.split_premiums(&event(10_000, 10_000), 1_000).unwrap();
        assert!(split.reinsurer_share > 0);
        assert_eq!(split.insurer_share + split.reinsurer_share, 1_000);
    }

    #[test]
    fn test_split_without_insurer_capital() {
        let pricing = engine(10_000, 10_000);
        let split = pricing.split_premiums(&event(0, 10_000), 1_000).unwrap();
        assert_eq!(split.reinsurer_share, 1_000);
    }

    #[test]
    fn test_split_without_any_capital_is_empty() {
        let pricing = engine(10_000, 0);
        let split = pricing.split_premiums(&event(0, 10_000), 1_000).unwrap();
        assert_eq!(split, PremiumSplit::default());
    }

    #[test]
    fn test_over_levered_event_still_priced() {
        // C * BPS / N truncates beta to zero
        let pricing = engine(10_000_000_000, 0);
        let e = event(1_000_000, 20_000_000_000);
        let quote = pricing.quote(&e, 1_000_000).unwrap();
        let modelled = quote.pricing.unwrap();
        assert_eq!(modelled.beta_bps, 0);
        assert_eq!(modelled.max_premium, 10_000_000);
        assert_eq!(quote.annualized_premium, 500);

        let split = pricing.split_premiums(&e, 1_000).unwrap();
        assert_eq!(split.insurer_share, 1_000);
    }
}
