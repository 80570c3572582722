//! Participant balance model
//!
//! Every party of the pool (insurer, reinsurer, policyholder, keeper calling
//! the periodic distribution) is a participant with one virtual balance split
//! into an available part and three locked parts:
//! - `locked_as_insurer`: collateral posted to the capital pool
//! - `locked_as_reinsurer`: collateral posted to the reinsurance pool
//! - `locked_as_policyholder_funds`: premiums collected but not yet distributed
//!
//! CRITICAL: All money values are u128 smallest units

use crate::core::math::{self, Amount, MathError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during balance operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Insufficient balance for active policies: requested {requested}, withdrawable {withdrawable} ({reserved} reserved)")]
    InsufficientBalanceForActivePolicies {
        requested: Amount,
        withdrawable: Amount,
        reserved: Amount,
    },

    #[error("Insufficient {kind:?} lock: required {required}, locked {locked}")]
    InsufficientLocked {
        kind: LockKind,
        required: Amount,
        locked: Amount,
    },

    #[error("Insufficient protocol fees: requested {requested}, accrued {accrued}")]
    InsufficientProtocolFees { requested: Amount, accrued: Amount },
}

/// The locked sub-balances of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockKind {
    Insurer,
    Reinsurer,
    PolicyholderFunds,
}

/// Virtual balance of one participant
///
/// # Example
/// ```
/// use riskpool_core_rs::{LockKind, Participant};
///
/// let mut alice = Participant::new("ALICE".to_string());
/// alice.record_deposit(1_000).unwrap();
/// alice.lock(LockKind::Insurer, 600).unwrap();
///
/// assert_eq!(alice.available(), 400);
/// assert_eq!(alice.locked(LockKind::Insurer), 600);
/// assert_eq!(alice.total_balance(), 1_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique participant identifier (e.g., "INSURER_A")
    id: String,

    /// Freely usable balance
    available: Amount,

    locked_as_insurer: Amount,
    locked_as_reinsurer: Amount,
    locked_as_policyholder_funds: Amount,

    /// Lifetime external inflows (deposits)
    total_deposited: Amount,

    /// Lifetime external outflows (withdrawals)
    total_withdrawn: Amount,

    /// Lifetime internal inflows (premiums earned, claim payouts, incentives)
    total_received: Amount,

    /// Lifetime internal outflows (premiums paid, capital consumed by claims)
    total_paid: Amount,
}

impl Participant {
    pub fn new(id: String) -> Self {
        Self {
            id,
            available: 0,
            locked_as_insurer: 0,
            locked_as_reinsurer: 0,
            locked_as_policyholder_funds: 0,
            total_deposited: 0,
            total_withdrawn: 0,
            total_received: 0,
            total_paid: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn available(&self) -> Amount {
        self.available
    }

    pub fn locked(&self, kind: LockKind) -> Amount {
        match kind {
            LockKind::Insurer => self.locked_as_insurer,
            LockKind::Reinsurer => self.locked_as_reinsurer,
            LockKind::PolicyholderFunds => self.locked_as_policyholder_funds,
        }
    }

    /// Sum of all locked sub-balances
    pub fn total_locked(&self) -> Amount {
        self.locked_as_insurer
            .saturating_add(self.locked_as_reinsurer)
            .saturating_add(self.locked_as_policyholder_funds)
    }

    /// Available plus every locked sub-balance
    pub fn total_balance(&self) -> Amount {
        self.available.saturating_add(self.total_locked())
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }

    pub fn total_received(&self) -> Amount {
        self.total_received
    }

    pub fn total_paid(&self) -> Amount {
        self.total_paid
    }

    /// Per-participant flow identity:
    /// `balance == deposited + received - withdrawn - paid`
    pub fn flows_balance(&self) -> bool {
        let inflow = self.total_deposited.checked_add(self.total_received);
        let outflow = self.total_withdrawn.checked_add(self.total_paid);
        match (inflow, outflow) {
            (Some(i), Some(o)) => i.checked_sub(o) == Some(self.total_balance()),
            _ => false,
        }
    }

    /// External funds arrived
    pub fn record_deposit(&mut self, amount: Amount) -> Result<(), MathError> {
        self.available = math::add(self.available, amount)?;
        self.total_deposited = math::add(self.total_deposited, amount)?;
        Ok(())
    }

    /// External funds left; caller has already checked `available`
    pub fn record_withdrawal(&mut self, amount: Amount) -> Result<(), BalanceError> {
        self.ensure_available(amount)?;
        self.available -= amount;
        self.total_withdrawn = self.total_withdrawn.saturating_add(amount);
        Ok(())
    }

    /// Internal inflow to `available`
    pub fn credit(&mut self, amount: Amount) -> Result<(), MathError> {
        self.available = math::add(self.available, amount)?;
        self.total_received = math::add(self.total_received, amount)?;
        Ok(())
    }

    /// Internal outflow from a locked sub-balance
    pub fn debit_locked(&mut self, kind: LockKind, amount: Amount) -> Result<(), BalanceError> {
        self.ensure_locked(kind, amount)?;
        *self.locked_mut(kind) -= amount;
        self.total_paid = self.total_paid.saturating_add(amount);
        Ok(())
    }

    /// Move funds from `available` into a locked sub-balance
    pub fn lock(&mut self, kind: LockKind, amount: Amount) -> Result<(), BalanceError> {
        self.ensure_available(amount)?;
        self.available -= amount;
        *self.locked_mut(kind) += amount;
        Ok(())
    }

    fn ensure_available(&self, amount: Amount) -> Result<(), BalanceError> {
        if self.available < amount {
            return Err(BalanceError::InsufficientBalance {
                required: amount,
                available: self.available,
            });
        }
        Ok(())
    }

    fn ensure_locked(&self, kind: LockKind, amount: Amount) -> Result<(), BalanceError> {
        let locked = self.locked(kind);
        if locked < amount {
            return Err(BalanceError::InsufficientLocked {
                kind,
                required: amount,
                locked,
            });
        }
        Ok(())
    }

    fn locked_mut(&mut self, kind: LockKind) -> &mut Amount {
        match kind {
            LockKind::Insurer => &mut self.locked_as_insurer,
            LockKind::Reinsurer => &mut self.locked_as_reinsurer,
            LockKind::PolicyholderFunds => &mut self.locked_as_policyholder_funds,
        }
    }
}
