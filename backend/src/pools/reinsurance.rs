//! Reinsurance pool
//!
//! Reinsurers back every event globally. Losses and premiums are shared
//! among them in proportion to deployable collateral
//! (`collateral_i - consumed_i`).

use crate::core::error::PoolError;
use crate::core::math::{self, Amount};
use crate::ledger::{Ledger, LockKind};
use crate::models::reinsurer::ReinsurerAccount;
use crate::pools::CapitalError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinsurancePool {
    reinsurers: BTreeMap<String, ReinsurerAccount>,
}

impl ReinsurancePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(accounts: Vec<ReinsurerAccount>) -> Self {
        Self {
            reinsurers: accounts
                .into_iter()
                .map(|a| (a.id().to_string(), a))
                .collect(),
        }
    }

    pub fn reinsurer(&self, id: &str) -> Option<&ReinsurerAccount> {
        self.reinsurers.get(id)
    }

    pub fn reinsurers(&self) -> impl Iterator<Item = &ReinsurerAccount> {
        self.reinsurers.values()
    }

    /// Capital still able to absorb losses across all reinsurers
    pub fn deployable_capital(&self) -> Result<Amount, PoolError> {
        Ok(math::sum(
            self.reinsurers
                .values()
                .filter(|a| a.is_active())
                .map(ReinsurerAccount::deployable),
        )?)
    }

    pub fn register(
        &mut self,
        ledger: &mut Ledger,
        participant: &str,
        collateral: Amount,
        min_collateral: Amount,
    ) -> Result<(), PoolError> {
        if self.reinsurers.get(participant).is_some_and(ReinsurerAccount::is_active) {
            return Err(CapitalError::AlreadyRegistered(participant.to_string()).into());
        }
        if collateral < min_collateral {
            return Err(CapitalError::BelowMinimumCollateral {
                provided: collateral,
                minimum: min_collateral,
            }
            .into());
        }

        ledger.lock(participant, LockKind::Reinsurer, collateral)?;
        self.reinsurers.insert(
            participant.to_string(),
            ReinsurerAccount::new(participant.to_string(), collateral),
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
        let account = self
            .reinsurers
            .get_mut(participant)
            .filter(|a| a.is_active())
            .ok_or_else(|| CapitalError::NotRegistered(participant.to_string()))?;
        account.add_collateral(amount)?;
        ledger.lock(participant, LockKind::Reinsurer, amount)?;
        Ok(account.collateral())
    }

    /// Deduct `amount` of claim losses pro rata to deployable collateral
    ///
    /// Fails with `InsufficientCollateral` if the pool as a whole cannot
    /// absorb `amount`; the caller is expected to cap the request first.
    pub fn consume_for_claim(
        &mut self,
        ledger: &mut Ledger,
        amount: Amount,
    ) -> Result<Vec<(String, Amount)>, PoolError> {
        if amount == 0 {
            return Ok(Vec::new());
        }
        let deployable = self.deployable_capital()?;
        if deployable < amount {
            return Err(CapitalError::InsufficientCollateral {
                requested: amount,
                deployable,
            }
            .into());
        }

        let weights = self.weights();
        let caps: Vec<Amount> = weights.iter().map(|(_, w)| *w).collect();
        let shares = math::apportion_exact(amount, &caps, &caps)?;

        let mut consumed = Vec::with_capacity(shares.len());
        for ((id, _), share) in weights.into_iter().zip(shares) {
            if share == 0 {
                continue;
            }
            if let Some(account) = self.reinsurers.get_mut(&id) {
                account.consume(share)?;
            }
            ledger.debit_locked(&id, LockKind::Reinsurer, share)?;
            consumed.push((id, share));
        }
        Ok(consumed)
    }

    /// Credit earned premiums pro rata to deployable collateral
    ///
    /// Returns the amount actually credited. With no deployable capital
    /// nothing is credited.
    pub fn credit_premiums(&mut self, ledger: &mut Ledger, amount: Amount) -> Result<Amount, PoolError> {
        let weights = self.weights();
        if amount == 0 || weights.is_empty() {
            return Ok(0);
        }
        let raw: Vec<Amount> = weights.iter().map(|(_, w)| *w).collect();
        let (shares, dust) = math::split_pro_rata(amount, &raw)?;

        for ((id, _), share) in weights.into_iter().zip(shares) {
            if share == 0 {
                continue;
            }
            if let Some(account) = self.reinsurers.get_mut(&id) {
                account.record_premium(share)?;
            }
            ledger.credit(&id, share)?;
        }
        Ok(amount - dust)
    }

    /// `(reinsurer, deployable)` pairs with non-zero weight
    fn weights(&self) -> Vec<(String, Amount)> {
        self.reinsurers
            .values()
            .filter(|a| a.is_active())
            .map(|a| (a.id().to_string(), a.deployable()))
            .filter(|(_, w)| *w > 0)
            .collect()
    }
}
