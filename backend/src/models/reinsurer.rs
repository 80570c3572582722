//! Reinsurer capital account
//!
//! Reinsurers back every event at once; `consumed_capital` is what claims
//! have used up.

use crate::core::math::{self, Amount, MathError};
use crate::pools::CapitalError;
use serde::{Deserialize, Serialize};

/// Capital account of a reinsurer (backs every event)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinsurerAccount {
    id: String,
    collateral: Amount,
    /// Capital already used up by claims
    consumed_capital: Amount,
    total_premiums: Amount,
    active: bool,
}

impl ReinsurerAccount {
    pub fn new(id: String, collateral: Amount) -> Self {
        Self {
            id,
            collateral,
            consumed_capital: 0,
            total_premiums: 0,
            active: true,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn collateral(&self) -> Amount {
        self.collateral
    }

    pub fn consumed_capital(&self) -> Amount {
        self.consumed_capital
    }

    pub fn total_premiums(&self) -> Amount {
        self.total_premiums
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Capital still able to absorb losses
    pub fn deployable(&self) -> Amount {
        self.collateral.saturating_sub(self.consumed_capital)
    }

    pub fn add_collateral(&mut self, amount: Amount) -> Result<(), MathError> {
        self.collateral = math::add(self.collateral, amount)?;
        Ok(())
    }

    pub fn consume(&mut self, amount: Amount) -> Result<(), CapitalError> {
        let deployable = self.deployable();
        if deployable < amount {
            return Err(CapitalError::InsufficientCollateral {
                requested: amount,
                deployable,
            });
        }
        self.consumed_capital += amount;
        Ok(())
    }

    pub fn record_premium(&mut self, amount: Amount) -> Result<(), MathError> {
        self.total_premiums = math::add(self.total_premiums, amount)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinsurer_consume_limited_by_deployable() {
        let mut reinsurer = ReinsurerAccount::new("R".to_string(), 500);
        reinsurer.consume(400).unwrap();
        assert_eq!(reinsurer.deployable(), 100);
        assert!(reinsurer.consume(101).is_err());
        assert_eq!(reinsurer.consumed_capital(), 400);
    }
}
