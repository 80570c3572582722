//! Capital pool (insurer side)
//!
//! Insurers register with collateral, top it up, and allocate it to the
//! events they want to back. An event's insurer capital is the sum of all
//! allocations to it.
//!
//! # Claim consumption
//!
//! `consume_for_claim` deducts a loss from every insurer allocated to the
//! event in proportion to `allocation_i / total_insurer_capital`. Truncation
//! remainders are handed out unit by unit (largest allocation first) so the
//! total deducted equals the loss exactly.

use crate::core::error::PoolError;
use crate::core::math::{self, Amount};
use crate::ledger::{Ledger, LockKind};
use crate::models::event::EventId;
use crate::models::insurer::InsurerAccount;
use crate::pools::CapitalError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapitalPool {
    insurers: BTreeMap<String, InsurerAccount>,
}

impl CapitalPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(accounts: Vec<InsurerAccount>) -> Self {
        Self {
            insurers: accounts
                .into_iter()
                .map(|a| (a.id().to_string(), a))
                .collect(),
        }
    }

    pub fn insurer(&self, id: &str) -> Option<&InsurerAccount> {
        self.insurers.get(id)
    }

    pub fn insurers(&self) -> impl Iterator<Item = &InsurerAccount> {
        self.insurers.values()
    }

    /// Collateral held by all active insurers
    pub fn total_collateral(&self) -> Result<Amount, PoolError> {
        Ok(math::sum(
            self.insurers
                .values()
                .filter(|a| a.is_active())
                .map(InsurerAccount::total_collateral),
        )?)
    }

    /// Sum of every insurer's allocation to `event_id`
    pub fn event_capital(&self, event_id: EventId) -> Result<Amount, PoolError> {
        Ok(math::sum(self.insurers.values().map(|a| a.allocation(event_id)))?)
    }

    /// `(insurer, allocation)` pairs for `event_id`, zero allocations skipped
    pub fn allocations_for(&self, event_id: EventId) -> Vec<(String, Amount)> {
        self.insurers
            .values()
            .filter(|a| a.is_active())
            .map(|a| (a.id().to_string(), a.allocation(event_id)))
            .filter(|(_, allocation)| *allocation > 0)
            .collect()
    }

    pub fn register(
        &mut self,
        ledger: &mut Ledger,
        participant: &str,
        collateral: Amount,
        min_collateral: Amount,
    ) -> Result<(), PoolError> {
        if self.insurers.get(participant).is_some_and(InsurerAccount::is_active) {
            return Err(CapitalError::AlreadyRegistered(participant.to_string()).into());
        }
        if collateral < min_collateral {
            return Err(CapitalError::BelowMinimumCollateral {
                provided: collateral,
                minimum: min_collateral,
            }
            .into());
        }

        ledger.lock(participant, LockKind::Insurer, collateral)?;
        self.insurers.insert(
            participant.to_string(),
            InsurerAccount::new(participant.to_string(), collateral),
        );
        Ok(())
    }

    /// Top up collateral; returns the new total
    pub fn add_capital(
        &mut self,
        ledger: &mut Ledger,
        participant: &str,
        amount: Amount,
    ) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Err(CapitalError::ZeroAmount.into());
        }
        let account = self.active_mut(participant)?;
        account.add_collateral(amount)?;
        ledger.lock(participant, LockKind::Insurer, amount)?;
        Ok(account.total_collateral())
    }

    pub fn allocate_to_event(
        &mut self,
        participant: &str,
        event_id: EventId,
        amount: Amount,
    ) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Err(CapitalError::ZeroAmount.into());
        }
        let account = self.active_mut(participant)?;
        account.allocate(event_id, amount)?;
        Ok(account.allocation(event_id))
    }

    pub fn remove_from_event(
        &mut self,
        participant: &str,
        event_id: EventId,
        amount: Amount,
    ) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Err(CapitalError::ZeroAmount.into());
        }
        let account = self.active_mut(participant)?;
        account.deallocate(event_id, amount)?;
        Ok(account.allocation(event_id))
    }

    /// Deduct `amount` of claim losses from the insurers backing `event_id`
    ///
    /// The deducted collateral leaves the insurers' locked balances; the
    /// caller credits it to the claimants. Returns the per-insurer deduction.
    pub fn consume_for_claim(
        &mut self,
        ledger: &mut Ledger,
        event_id: EventId,
        amount: Amount,
    ) -> Result<Vec<(String, Amount)>, PoolError> {
        if amount == 0 {
            return Ok(Vec::new());
        }
        let allocations = self.allocations_for(event_id);
        let weights: Vec<Amount> = allocations.iter().map(|(_, a)| *a).collect();
        let shares = math::apportion_exact(amount, &weights, &weights)?;

        let mut consumed = Vec::with_capacity(shares.len());
        for ((id, _), share) in allocations.into_iter().zip(shares) {
            if share == 0 {
                continue;
            }
            self.active_mut(&id)?.consume(event_id, share)?;
            ledger.debit_locked(&id, LockKind::Insurer, share)?;
            consumed.push((id, share));
        }
        Ok(consumed)
    }

    /// Credit `amount` of earned premiums to the insurers backing `event_id`
    ///
    /// Returns the amount actually credited; the truncation dust
    /// (`amount - credited`) is left to the caller.
    pub fn credit_premiums(
        &mut self,
        ledger: &mut Ledger,
        event_id: EventId,
        amount: Amount,
    ) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Ok(0);
        }
        let allocations = self.allocations_for(event_id);
        let weights: Vec<Amount> = allocations.iter().map(|(_, a)| *a).collect();
        let (shares, dust) = math::split_pro_rata(amount, &weights)?;

        for ((id, _), share) in allocations.into_iter().zip(shares) {
            if share == 0 {
                continue;
            }
            self.active_mut(&id)?.record_premium(share)?;
            ledger.credit(&id, share)?;
        }
        Ok(amount - dust)
    }

    fn active_mut(&mut self, participant: &str) -> Result<&mut InsurerAccount, PoolError> {
        self.insurers
            .get_mut(participant)
            .filter(|a| a.is_active())
            .ok_or_else(|| CapitalError::NotRegistered(participant.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(insurers: &[(&str, Amount)]) -> (CapitalPool, Ledger) {
        let mut ledger = Ledger::new();
        let mut pool = CapitalPool::new();
        for (id, collateral) in insurers {
            ledger.deposit(id, *collateral).unwrap();
            pool.register(&mut ledger, id, *collateral, 1).unwrap();
        }
        (pool, ledger)
    }

    #[test]
    fn test_register_locks_collateral() {
        let (pool, ledger) = setup(&[("I1", 5_000)]);
        let participant = ledger.participant("I1").unwrap();
        assert_eq!(participant.available(), 0);
        assert_eq!(participant.locked(LockKind::Insurer), 5_000);
        assert_eq!(pool.total_collateral().unwrap(), 5_000);
    }

    #[test]
    fn test_register_twice_rejected() {
        let (mut pool, mut ledger) = setup(&[("I1", 5_000)]);
        ledger.deposit("I1", 5_000).unwrap();
        assert_eq!(
            pool.register(&mut ledger, "I1", 5_000, 1),
            Err(PoolError::Capital(CapitalError::AlreadyRegistered("I1".to_string())))
        );
    }

    #[test]
    fn test_consume_proportional_to_allocation() {
        let (mut pool, mut ledger) = setup(&[("I1", 3_000), ("I2", 1_000)]);
        pool.allocate_to_event("I1", 1, 3_000).unwrap();
        pool.allocate_to_event("I2", 1, 1_000).unwrap();

        let consumed = pool.consume_for_claim(&mut ledger, 1, 2_000).unwrap();
        assert_eq!(
            consumed,
            vec![("I1".to_string(), 1_500), ("I2".to_string(), 500)]
        );
        assert_eq!(pool.event_capital(1).unwrap(), 2_000);
        assert_eq!(ledger.participant("I1").unwrap().locked(LockKind::Insurer), 1_500);
    }

    #[test]
    fn test_consume_distributes_remainder() {
        let (mut pool, mut ledger) = setup(&[("I1", 100), ("I2", 100), ("I3", 100)]);
        for id in ["I1", "I2", "I3"] {
            pool.allocate_to_event(id, 9, 100).unwrap();
        }
        let consumed = pool.consume_for_claim(&mut ledger, 9, 100).unwrap();
        let total: Amount = consumed.iter().map(|(_, a)| *a).sum();
        assert_eq!(total, 100);
        assert_eq!(pool.event_capital(9).unwrap(), 200);
    }

    #[test]
    fn test_credit_premiums_returns_dust() {
        let (mut pool, mut ledger) = setup(&[("I1", 100), ("I2", 100), ("I3", 100)]);
        for id in ["I1", "I2", "I3"] {
            pool.allocate_to_event(id, 1, 100).unwrap();
        }
        // escrowed premium released by the payer
        ledger.deposit("PAYER", 10).unwrap();
        ledger.lock("PAYER", LockKind::PolicyholderFunds, 10).unwrap();
        ledger.debit_locked("PAYER", LockKind::PolicyholderFunds, 10).unwrap();
        let credited = pool.credit_premiums(&mut ledger, 1, 10).unwrap();
        assert_eq!(credited, 9);
        assert_eq!(pool.insurer("I1").unwrap().total_premiums(), 3);
        assert_eq!(ledger.available("I2"), 3);
    }
}
