//! Capital pools
//!
//! - **capital**: insurers, collateral allocated per event
//! - **reinsurance**: reinsurers, collateral backing every event
//!
//! Both pools own their accounts exclusively and move the matching locked
//! balances through the [`Ledger`](crate::ledger::Ledger).

pub mod capital;
pub mod reinsurance;

pub use capital::CapitalPool;
pub use reinsurance::ReinsurancePool;

use crate::core::math::Amount;
use thiserror::Error;

/// Errors raised by the capital pools
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapitalError {
    #[error("Participant {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Participant {0} is not registered")]
    NotRegistered(String),

    #[error("Collateral {provided} below minimum {minimum}")]
    BelowMinimumCollateral { provided: Amount, minimum: Amount },

    #[error("Amount must be positive")]
    ZeroAmount,

    #[error("Insufficient collateral: requested {requested}, deployable {deployable}")]
    InsufficientCollateral { requested: Amount, deployable: Amount },

    #[error("Insufficient allocation: requested {requested}, allocated {allocated}")]
    InsufficientAllocation { requested: Amount, allocated: Amount },
}
