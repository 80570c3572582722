//! Risk Pool Core - Rust Engine
//!
//! Mutual risk-pooling ledger: insurers and reinsurers post collateral,
//! policyholders buy parametric coverage on registered events, premiums
//! stream from holders to capital providers, and triggered events pay out
//! from the allocated capital.
//!
//! # Architecture
//!
//! - **core**: Clock, fixed-point math, configuration, errors
//! - **models**: Domain types (Participant, InsurerAccount, Event, Policy, State)
//! - **ledger**: Participant balances, conservation, payment asset boundary
//! - **pools**: Insurer capital pool and reinsurance pool
//! - **events**: Event registry and lifecycle
//! - **policy**: Policy book
//! - **pricing**: Risk pricing model and premium splits
//! - **orchestrator**: Pool engine, distribution coordinator, checkpoints
//!
//! # Critical Invariants
//!
//! 1. All money values are u128 in the asset's smallest unit
//! 2. Every internal movement debits exactly what it credits
//! 3. Failed operations leave no partial effects
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod core;
pub mod events;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod pools;
pub mod pricing;

// Re-exports for convenience
pub use crate::core::config::{ConfigError, PoolConfig};
pub use crate::core::error::{CheckpointError, DistributionError, ErrorKind, PoolError};
pub use crate::core::math::{Amount, Bps, MathError, BPS};
pub use crate::core::time::{ClockError, LedgerClock, Timestamp};
pub use events::{EventError, EventRegistry};
pub use ledger::{AssetError, InMemoryAsset, Ledger, PaymentAsset};
pub use models::{
    Activity, ActivityLog, BalanceError, Event, EventId, EventStatus, InsurerAccount, LockKind,
    Participant, Policy, PolicyId, PoolState, ReinsurerAccount, RiskParameters,
};
pub use orchestrator::{
    compute_config_hash, CollectionResult, DistributionResult, PoolEngine, PoolSnapshot,
    ReconciliationReport, SettlementResult, SharedPool,
};
pub use policy::{PolicyBook, PolicyError};
pub use pools::{CapitalError, CapitalPool, ReinsurancePool};
pub use pricing::{PremiumQuote, PremiumSplit, ReinsuranceState, RiskPricingEngine};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn riskpool_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::engine::PyPoolEngine>()?;
    Ok(())
}
