//! Checkpoint - Save/Load Pool State
//!
//! Serializes the four logical tables (participants, pools, events,
//! policies) together with ledger totals, the cached risk state and the
//! clock, so a pool can be persisted and resumed.
//!
//! # Critical Invariants
//!
//! - **Config Matching**: State can only be loaded with the config that produced it
//! - **Conservation**: Restored balances must satisfy the ledger identities
//! - **Cross-references**: Locks, allocations and escrow must agree across tables

use crate::core::config::PoolConfig;
use crate::core::error::{CheckpointError, PoolError};
use crate::core::math::Amount;
use crate::core::time::{LedgerClock, Timestamp};
use crate::events::EventRegistry;
use crate::ledger::{Ledger, PaymentAsset};
use crate::models::activity::{Activity, ActivityLog};
use crate::models::event::Event;
use crate::models::insurer::InsurerAccount;
use crate::models::participant::Participant;
use crate::models::policy::Policy;
use crate::models::reinsurer::ReinsurerAccount;
use crate::models::state::PoolState;
use crate::orchestrator::engine::PoolEngine;
use crate::policy::PolicyBook;
use crate::pools::{CapitalPool, ReinsurancePool};
use crate::pricing::{ReinsuranceState, RiskPricingEngine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Capital pool tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolsSnapshot {
    pub insurers: Vec<InsurerAccount>,
    pub reinsurers: Vec<ReinsurerAccount>,
}

/// Complete pool state snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Unique id of this snapshot
    pub snapshot_id: String,

    /// SHA256 hash of the config that produced the state
    pub config_hash: String,

    /// Latest timestamp accepted before the snapshot
    pub last_seen: Option<Timestamp>,

    pub participants: Vec<Participant>,
    pub pools: PoolsSnapshot,
    pub events: Vec<Event>,
    pub policies: Vec<Policy>,

    pub total_system_liquidity: Amount,
    pub protocol_fees: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,

    pub risk_state: ReinsuranceState,
    pub activities: Vec<Activity>,
}

impl<A: PaymentAsset> PoolEngine<A> {
    /// Capture the complete state
    pub fn snapshot(&self) -> Result<PoolSnapshot, PoolError> {
        let state = self.state();
        let ledger = state.ledger();
        Ok(PoolSnapshot {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            config_hash: compute_config_hash(self.config())?,
            last_seen: state.clock().last_seen(),
            participants: ledger.participants().cloned().collect(),
            pools: PoolsSnapshot {
                insurers: state.capital_pool().insurers().cloned().collect(),
                reinsurers: state.reinsurance_pool().reinsurers().cloned().collect(),
            },
            events: state.events().events().cloned().collect(),
            policies: state.policies().policies().cloned().collect(),
            total_system_liquidity: ledger.total_system_liquidity(),
            protocol_fees: ledger.protocol_fees(),
            total_deposited: ledger.total_deposited(),
            total_withdrawn: ledger.total_withdrawn(),
            risk_state: *state.pricing().state(),
            activities: self.activity_log().activities().to_vec(),
        })
    }

    /// Rebuild an engine from a snapshot
    ///
    /// Rejects snapshots taken under a different config or whose tables
    /// violate a pool invariant. The risk state is recomputed and must
    /// match the stored one.
    pub fn restore(config: PoolConfig, snapshot: PoolSnapshot, asset: A) -> Result<Self, PoolError> {
        config.validate()?;
        let actual = compute_config_hash(&config)?;
        if actual != snapshot.config_hash {
            return Err(CheckpointError::ConfigMismatch {
                expected: snapshot.config_hash,
                actual,
            }
            .into());
        }

        let mut state = PoolState {
            ledger: Ledger::from_parts(
                snapshot.participants,
                snapshot.total_system_liquidity,
                snapshot.protocol_fees,
                snapshot.total_deposited,
                snapshot.total_withdrawn,
            ),
            capital: CapitalPool::from_accounts(snapshot.pools.insurers),
            reinsurance: ReinsurancePool::from_accounts(snapshot.pools.reinsurers),
            events: EventRegistry::from_events(snapshot.events)
                .map_err(|e| CheckpointError::StateValidation(format!("event ids: {}", e)))?,
            policies: PolicyBook::from_policies(snapshot.policies)
                .map_err(|e| CheckpointError::StateValidation(format!("policy ids: {}", e)))?,
            pricing: RiskPricingEngine::new(config.risk_loading_bps),
            clock: LedgerClock::from_last_seen(snapshot.last_seen),
        };
        state
            .check_invariants()
            .map_err(CheckpointError::StateValidation)?;

        state.recompute_risk(&config)?;
        if *state.pricing().state() != snapshot.risk_state {
            return Err(CheckpointError::StateValidation(
                "stored risk state does not match recomputed totals".to_string(),
            )
            .into());
        }

        let mut activity_log = ActivityLog::new();
        for activity in snapshot.activities {
            activity_log.log(activity);
        }

        tracing::info!(
            snapshot_id = %snapshot.snapshot_id,
            events = state.events().len(),
            policies = state.policies().len(),
            "Pool restored from checkpoint"
        );
        Ok(Self::from_parts(config, state, asset, activity_log))
    }

    /// Snapshot serialized as JSON
    pub fn save_state(&self) -> Result<String, PoolError> {
        let snapshot = self.snapshot()?;
        serde_json::to_string(&snapshot)
            .map_err(|e| CheckpointError::Serialization(format!("Snapshot serialization failed: {}", e)).into())
    }

    /// Restore from JSON produced by [`save_state`](Self::save_state)
    pub fn load_state(config: PoolConfig, json: &str, asset: A) -> Result<Self, PoolError> {
        let snapshot: PoolSnapshot = serde_json::from_str(json)
            .map_err(|e| CheckpointError::Serialization(format!("Snapshot deserialization failed: {}", e)))?;
        Self::restore(config, snapshot, asset)
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on field or map ordering.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, PoolError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        CheckpointError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        CheckpointError::Serialization(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
