//! Payment asset collaborator
//!
//! The ledger keeps virtual balances only; real funds enter and leave through
//! a [`PaymentAsset`]. The ledger calls it on deposit, withdraw and protocol
//! fee withdrawal, nowhere else, so internal liquidity always equals
//! `sum(transfer_in) - sum(transfer_out)`.

use crate::core::math::Amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("Wallet {account} holds {balance}, cannot transfer {amount}")]
    InsufficientWallet {
        account: String,
        balance: Amount,
        amount: Amount,
    },

    #[error("Custody holds {custody}, cannot release {amount}")]
    InsufficientCustody { custody: Amount, amount: Amount },

    #[error("Asset transfer rejected: {0}")]
    Rejected(String),
}

/// Token custody seen from the ledger
pub trait PaymentAsset {
    /// Pull `amount` from `from` into ledger custody
    fn transfer_in(&mut self, from: &str, amount: Amount) -> Result<(), AssetError>;

    /// Release `amount` from ledger custody to `to`
    fn transfer_out(&mut self, to: &str, amount: Amount) -> Result<(), AssetError>;

    /// Funds currently held in custody, if the asset can tell
    fn custody(&self) -> Option<Amount> {
        None
    }
}

/// In-process asset with explicit external wallets
///
/// # Example
/// ```
/// use riskpool_core_rs::{InMemoryAsset, PaymentAsset};
///
/// let mut asset = InMemoryAsset::new();
/// asset.mint("ALICE", 100);
/// asset.transfer_in("ALICE", 60).unwrap();
/// assert_eq!(asset.wallet("ALICE"), 40);
/// assert_eq!(asset.custody(), Some(60));
/// assert!(asset.transfer_out("BOB", 61).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryAsset {
    wallets: BTreeMap<String, Amount>,
    custody: Amount,
}

impl InMemoryAsset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create funds in an external wallet (test and scripting helper)
    pub fn mint(&mut self, account: &str, amount: Amount) {
        let balance = self.wallets.entry(account.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn wallet(&self, account: &str) -> Amount {
        self.wallets.get(account).copied().unwrap_or(0)
    }
}

impl PaymentAsset for InMemoryAsset {
    fn transfer_in(&mut self, from: &str, amount: Amount) -> Result<(), AssetError> {
        let balance = self.wallet(from);
        if balance < amount {
            return Err(AssetError::InsufficientWallet {
                account: from.to_string(),
                balance,
                amount,
            });
        }
        let custody = self
            .custody
            .checked_add(amount)
            .ok_or_else(|| AssetError::Rejected("custody overflow".to_string()))?;
        self.wallets.insert(from.to_string(), balance - amount);
        self.custody = custody;
        Ok(())
    }

    fn transfer_out(&mut self, to: &str, amount: Amount) -> Result<(), AssetError> {
        if self.custody < amount {
            return Err(AssetError::InsufficientCustody {
                custody: self.custody,
                amount,
            });
        }
        self.custody -= amount;
        self.mint(to, amount);
        Ok(())
    }

    fn custody(&self) -> Option<Amount> {
        Some(self.custody)
    }
}
