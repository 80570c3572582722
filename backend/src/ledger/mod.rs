//! Ledger: participant balances, system liquidity and protocol fees
//!
//! The ledger owns every balance mutation. External movements (deposit,
//! withdraw) go through the [`PaymentAsset`] collaborator at the engine level;
//! internal movements (credit, lock, debit from a locked balance) are
//! crate-private and only called by the other components in balanced pairs.
//! Funds never return from a locked balance to `available` directly: collateral
//! and escrow leave a participant only through `debit_locked`.
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: `sum(all balances) + protocol_fees == total_system_liquidity`
//! 2. **Reconciliation**: `total_system_liquidity == total_deposited - total_withdrawn`
//! 3. **No Overdraft**: `available` and every locked sub-balance stay >= 0

pub mod asset;

pub use crate::models::participant::{BalanceError, LockKind, Participant};
pub use asset::{AssetError, InMemoryAsset, PaymentAsset};

use crate::core::error::PoolError;
use crate::core::math::{self, Amount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    participants: BTreeMap<String, Participant>,
    total_system_liquidity: Amount,
    protocol_fees: Amount,
    total_deposited: Amount,
    total_withdrawn: Amount,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from checkpointed parts
    pub fn from_parts(
        participants: Vec<Participant>,
        total_system_liquidity: Amount,
        protocol_fees: Amount,
        total_deposited: Amount,
        total_withdrawn: Amount,
    ) -> Self {
        Self {
            participants: participants
                .into_iter()
                .map(|p| (p.id().to_string(), p))
                .collect(),
            total_system_liquidity,
            protocol_fees,
            total_deposited,
            total_withdrawn,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    /// Available balance, zero for unknown participants
    pub fn available(&self, id: &str) -> Amount {
        self.participants.get(id).map_or(0, Participant::available)
    }

    pub fn total_system_liquidity(&self) -> Amount {
        self.total_system_liquidity
    }

    pub fn protocol_fees(&self) -> Amount {
        self.protocol_fees
    }

    pub fn total_deposited(&self) -> Amount {
        self.total_deposited
    }

    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }

    /// Sum of every participant's available and locked balances
    pub fn total_balances(&self) -> Result<Amount, PoolError> {
        Ok(math::sum(self.participants.values().map(Participant::total_balance))?)
    }

    /// Check both conservation identities
    pub fn is_conserved(&self) -> bool {
        let held = self
            .total_balances()
            .ok()
            .and_then(|b| b.checked_add(self.protocol_fees));
        let net_flow = self.total_deposited.checked_sub(self.total_withdrawn);
        held == Some(self.total_system_liquidity) && net_flow == Some(self.total_system_liquidity)
    }

    // ========================================================================
    // External movements
    // ========================================================================

    /// Record funds arriving from the payment asset
    pub fn deposit(&mut self, id: &str, amount: Amount) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Err(BalanceError::ZeroAmount.into());
        }
        let liquidity = math::add(self.total_system_liquidity, amount)?;
        let deposited = math::add(self.total_deposited, amount)?;
        let participant = self.entry(id);
        participant.record_deposit(amount)?;
        let available = participant.available();
        self.total_system_liquidity = liquidity;
        self.total_deposited = deposited;
        Ok(available)
    }

    /// Record funds leaving to the payment asset
    ///
    /// `reserved` is the part of `available` that must stay in place to keep
    /// the participant's active policies funded.
    pub fn withdraw(&mut self, id: &str, amount: Amount, reserved: Amount) -> Result<Amount, PoolError> {
        if amount == 0 {
            return Err(BalanceError::ZeroAmount.into());
        }
        let participant = self
            .participants
            .get_mut(id)
            .ok_or_else(|| BalanceError::UnknownParticipant(id.to_string()))?;

        let available = participant.available();
        if available < amount {
            return Err(BalanceError::InsufficientBalance {
                required: amount,
                available,
            }
            .into());
        }
        if available - amount < reserved {
            return Err(BalanceError::InsufficientBalanceForActivePolicies {
                requested: amount,
                withdrawable: available.saturating_sub(reserved),
                reserved,
            }
            .into());
        }

        participant.record_withdrawal(amount)?;
        let remaining = participant.available();
        self.total_system_liquidity = math::sub(self.total_system_liquidity, amount)?;
        self.total_withdrawn = math::add(self.total_withdrawn, amount)?;
        Ok(remaining)
    }

    /// Pay accrued protocol fees out of the system
    pub fn withdraw_protocol_fees(&mut self, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Err(BalanceError::ZeroAmount.into());
        }
        if self.protocol_fees < amount {
            return Err(BalanceError::InsufficientProtocolFees {
                requested: amount,
                accrued: self.protocol_fees,
            }
            .into());
        }
        self.protocol_fees -= amount;
        self.total_system_liquidity = math::sub(self.total_system_liquidity, amount)?;
        self.total_withdrawn = math::add(self.total_withdrawn, amount)?;
        Ok(())
    }

    // ========================================================================
    // Internal movements (always paired by the caller)
    // ========================================================================

    pub(crate) fn credit(&mut self, id: &str, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Ok(());
        }
        self.entry(id).credit(amount)?;
        Ok(())
    }

    pub(crate) fn debit_locked(&mut self, id: &str, kind: LockKind, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Ok(());
        }
        self.existing_mut(id)?.debit_locked(kind, amount)?;
        Ok(())
    }

    pub(crate) fn lock(&mut self, id: &str, kind: LockKind, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Ok(());
        }
        self.existing_mut(id)?.lock(kind, amount)?;
        Ok(())
    }

    /// Book an amount already debited from a participant as protocol revenue
    pub(crate) fn accrue_protocol_fees(&mut self, amount: Amount) -> Result<(), PoolError> {
        self.protocol_fees = math::add(self.protocol_fees, amount)?;
        Ok(())
    }

    fn entry(&mut self, id: &str) -> &mut Participant {
        self.participants
            .entry(id.to_string())
            .or_insert_with(|| Participant::new(id.to_string()))
    }

    fn existing_mut(&mut self, id: &str) -> Result<&mut Participant, PoolError> {
        self.participants
            .get_mut(id)
            .ok_or_else(|| BalanceError::UnknownParticipant(id.to_string()).into())
    }
}
