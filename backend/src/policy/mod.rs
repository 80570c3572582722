//! Policy book
//!
//! Individual coverage policies and their lockup/activation/claim state
//! machine. See [`PolicyBook`].

pub mod book;

pub use book::PolicyBook;

use crate::core::math::Amount;
use crate::core::time::Timestamp;
use crate::models::event::EventId;
use crate::models::policy::PolicyId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Policy {0} does not exist")]
    UnknownPolicy(PolicyId),

    #[error("Participant {caller} does not hold policy {policy_id}")]
    NotPolicyHolder { policy_id: PolicyId, caller: String },

    #[error("Coverage must be positive")]
    ZeroCoverage,

    #[error("Lockup not expired: activation at {activation_time}, now {now}")]
    LockupNotExpired {
        activation_time: Timestamp,
        now: Timestamp,
    },

    #[error("Policy {0} is already active")]
    AlreadyActive(PolicyId),

    #[error("Policy {0} has already been claimed")]
    AlreadyClaimed(PolicyId),

    #[error("Event {0} has no insurer capital allocated")]
    NoCapitalBacking(EventId),

    #[error("Insufficient funds for policy: required {required}, available {available}")]
    InsufficientFundsForPolicy { required: Amount, available: Amount },
}
