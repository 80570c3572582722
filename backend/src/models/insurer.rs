//! Insurer capital account
//!
//! Insurers back specific events: their collateral is allocated per event and
//! `consumed_capital` is the part committed to allocations.
//!
//! Invariant: `consumed_capital <= total_collateral`.

use crate::core::math::{self, Amount, MathError};
use crate::models::event::EventId;
use crate::pools::CapitalError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capital account of an insurer
///
/// # Example
/// ```
/// use riskpool_core_rs::InsurerAccount;
///
/// let mut insurer = InsurerAccount::new("INSURER_A".to_string(), 10_000);
/// insurer.allocate(1, 6_000).unwrap();
/// assert_eq!(insurer.deployable(), 4_000);
/// assert!(insurer.allocate(2, 4_001).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurerAccount {
    id: String,
    total_collateral: Amount,
    /// Sum of all event allocations
    consumed_capital: Amount,
    total_premiums: Amount,
    active: bool,
    allocations: BTreeMap<EventId, Amount>,
}

impl InsurerAccount {
    pub fn new(id: String, collateral: Amount) -> Self {
        Self {
            id,
            total_collateral: collateral,
            consumed_capital: 0,
            total_premiums: 0,
            active: true,
            allocations: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn total_collateral(&self) -> Amount {
        self.total_collateral
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

    /// Collateral not yet committed to any event
    pub fn deployable(&self) -> Amount {
        self.total_collateral.saturating_sub(self.consumed_capital)
    }

    pub fn allocation(&self, event_id: EventId) -> Amount {
        self.allocations.get(&event_id).copied().unwrap_or(0)
    }

    pub fn allocations(&self) -> &BTreeMap<EventId, Amount> {
        &self.allocations
    }

    pub fn add_collateral(&mut self, amount: Amount) -> Result<(), MathError> {
        self.total_collateral = math::add(self.total_collateral, amount)?;
        Ok(())
    }

    pub fn allocate(&mut self, event_id: EventId, amount: Amount) -> Result<(), CapitalError> {
        let deployable = self.deployable();
        if deployable < amount {
            return Err(CapitalError::InsufficientCollateral {
                requested: amount,
                deployable,
            });
        }
        *self.allocations.entry(event_id).or_insert(0) += amount;
        self.consumed_capital += amount;
        Ok(())
    }

    pub fn deallocate(&mut self, event_id: EventId, amount: Amount) -> Result<(), CapitalError> {
        let allocated = self.allocation(event_id);
        if allocated < amount {
            return Err(CapitalError::InsufficientAllocation {
                requested: amount,
                allocated,
            });
        }
        self.reduce_allocation(event_id, amount);
        self.consumed_capital -= amount;
        Ok(())
    }

    /// Claim consumption: capital leaves the pool for good
    pub fn consume(&mut self, event_id: EventId, amount: Amount) -> Result<(), CapitalError> {
        self.deallocate(event_id, amount)?;
        self.total_collateral -= amount;
        Ok(())
    }

    pub fn record_premium(&mut self, amount: Amount) -> Result<(), MathError> {
        self.total_premiums = math::add(self.total_premiums, amount)?;
        Ok(())
    }

    fn reduce_allocation(&mut self, event_id: EventId, amount: Amount) {
        if let Some(allocated) = self.allocations.get_mut(&event_id) {
            *allocated -= amount;
            if *allocated == 0 {
                self.allocations.remove(&event_id);
            }
        }
    }
}
