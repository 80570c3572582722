//! Domain models for the risk pool

pub mod activity;
pub mod event;
pub mod insurer;
pub mod participant;
pub mod policy;
pub mod reinsurer;
pub mod state;

// Re-exports
pub use activity::{Activity, ActivityLog, CapitalRole};
pub use event::{Event, EventId, EventStatus, RiskParameters};
pub use insurer::InsurerAccount;
pub use participant::{BalanceError, LockKind, Participant};
pub use policy::{Policy, PolicyId};
pub use reinsurer::ReinsurerAccount;
pub use state::PoolState;
