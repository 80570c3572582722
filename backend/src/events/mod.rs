//! Peril events
//!
//! The [`EventRegistry`] owns every [`Event`](crate::models::event::Event)
//! and its accumulators (coverage, insurer capital, premiums, payouts).

pub mod registry;

pub use registry::EventRegistry;

use crate::core::math::MathError;
use crate::models::event::EventId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("Event {0} does not exist")]
    UnknownEvent(EventId),

    #[error("Event name must not be empty")]
    EmptyName,

    #[error("Invalid risk parameters: {0}")]
    InvalidRiskParameters(String),

    #[error("Event {0} is not active")]
    EventNotActive(EventId),

    #[error("Event {0} has already been triggered")]
    AlreadyTriggered(EventId),

    #[error("Event {0} has not been triggered")]
    NotTriggered(EventId),

    #[error("Event {0} has unsettled claims")]
    ClaimsOutstanding(EventId),

    #[error(transparent)]
    Math(#[from] MathError),
}
