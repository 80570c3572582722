//! Orchestrator - the pool engine and its coordinators
//!
//! - `engine.rs`: [`PoolEngine`], transactions, ledger/capital/event operations
//! - `distribution.rs`: policies, premium collection/distribution, claims
//! - `checkpoint.rs`: snapshot and restore
//! - `service.rs`: [`SharedPool`] single-writer handle

pub mod checkpoint;
pub mod distribution;
pub mod engine;
pub mod service;

// Re-export main types for convenience
pub use checkpoint::{compute_config_hash, PoolSnapshot, PoolsSnapshot};
pub use distribution::{CollectionResult, DistributionResult, SettlementResult};
pub use engine::{PoolEngine, ReconciliationReport};
pub use service::SharedPool;
