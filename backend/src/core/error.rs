//! Top-level error type and taxonomy
//!
//! Each component owns its error enum; [`PoolError`] composes them so engine
//! operations can propagate any of them with `?`. [`ErrorKind`] classifies
//! every failure so callers can decide between "fix the input", "retry later"
//! and "page an operator".

use crate::core::config::ConfigError;
use crate::core::math::{Amount, MathError};
use crate::core::time::{ClockError, Timestamp};
use crate::events::EventError;
use crate::ledger::{AssetError, BalanceError};
use crate::policy::PolicyError;
use crate::pools::CapitalError;
use thiserror::Error;

/// Failure classes of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: zero amount, below minimum, unknown id
    Validation,
    /// Operation not allowed in the current state
    State,
    /// Balance, collateral or allocation too small
    InsufficientFunds,
    /// Division by zero or overflow
    Arithmetic,
    /// Caller lacks the registrar capability
    Unauthorized,
    /// Triggered payouts exceed backing capital; needs operator intervention
    FatalInvariantViolation,
}

/// Errors raised by the distribution coordinator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistributionError {
    #[error("Distribution too early: next allowed at {next_allowed}")]
    TooEarly { next_allowed: Timestamp },

    #[error("Distribution interval {interval}s below minimum {minimum}s")]
    IntervalBelowMinimum { interval: u64, minimum: u64 },

    #[error("Insufficient insurer capital for event {event_id}: allocated {allocated}, payouts {payouts}")]
    InsufficientInsurerCapital {
        event_id: u64,
        allocated: Amount,
        payouts: Amount,
    },
}

/// Errors raised while restoring a checkpoint
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Config mismatch: checkpoint {expected}, supplied {actual}")]
    ConfigMismatch { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State validation error: {0}")]
    StateValidation(String),
}

/// Any failure of a ledger operation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Capital(#[from] CapitalError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Clock(#[from] ClockError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("Participant {participant} is not an authorized registrar")]
    Unauthorized { participant: String },
}

impl PoolError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolError::Balance(e) => match e {
                BalanceError::ZeroAmount | BalanceError::UnknownParticipant(_) => {
                    ErrorKind::Validation
                }
                BalanceError::InsufficientBalance { .. }
                | BalanceError::InsufficientBalanceForActivePolicies { .. }
                | BalanceError::InsufficientLocked { .. }
                | BalanceError::InsufficientProtocolFees { .. } => ErrorKind::InsufficientFunds,
            },
            PoolError::Capital(e) => match e {
                CapitalError::BelowMinimumCollateral { .. }
                | CapitalError::ZeroAmount
                | CapitalError::NotRegistered(_) => ErrorKind::Validation,
                CapitalError::AlreadyRegistered(_) => ErrorKind::State,
                CapitalError::InsufficientCollateral { .. }
                | CapitalError::InsufficientAllocation { .. } => ErrorKind::InsufficientFunds,
            },
            PoolError::Event(e) => match e {
                EventError::UnknownEvent(_)
                | EventError::EmptyName
                | EventError::InvalidRiskParameters(_) => ErrorKind::Validation,
                EventError::EventNotActive(_)
                | EventError::AlreadyTriggered(_)
                | EventError::NotTriggered(_)
                | EventError::ClaimsOutstanding(_) => ErrorKind::State,
                EventError::Math(_) => ErrorKind::Arithmetic,
            },
            PoolError::Policy(e) => match e {
                PolicyError::UnknownPolicy(_)
                | PolicyError::NotPolicyHolder { .. }
                | PolicyError::ZeroCoverage => ErrorKind::Validation,
                PolicyError::LockupNotExpired { .. }
                | PolicyError::AlreadyActive(_)
                | PolicyError::AlreadyClaimed(_)
                | PolicyError::NoCapitalBacking(_) => ErrorKind::State,
                PolicyError::InsufficientFundsForPolicy { .. } => ErrorKind::InsufficientFunds,
            },
            PoolError::Distribution(e) => match e {
                DistributionError::TooEarly { .. } => ErrorKind::State,
                DistributionError::IntervalBelowMinimum { .. } => ErrorKind::Validation,
                DistributionError::InsufficientInsurerCapital { .. } => {
                    ErrorKind::FatalInvariantViolation
                }
            },
            PoolError::Math(_) => ErrorKind::Arithmetic,
            PoolError::Clock(_) => ErrorKind::Validation,
            PoolError::Config(_) => ErrorKind::Validation,
            PoolError::Asset(_) => ErrorKind::InsufficientFunds,
            PoolError::Checkpoint(_) => ErrorKind::Validation,
            PoolError::Unauthorized { .. } => ErrorKind::Unauthorized,
        }
    }

    /// True for failures that need operator intervention
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::FatalInvariantViolation
    }
}
