//! Pool state
//!
//! The complete book of a pool: ledger balances, both capital pools, the
//! event registry, the policy book, the cached risk state and the clock.
//! The engine clones it as a draft for every mutating operation and commits
//! the draft only on success.
//!
//! # Critical Invariants
//!
//! 1. **Conservation**: `sum(balances) + protocol_fees == total_system_liquidity`
//! 2. **Insurer locks**: each insurer's `locked_as_insurer == total_collateral`
//! 3. **Reinsurer locks**: each reinsurer's `locked_as_reinsurer == collateral - consumed`
//! 4. **Event capital**: `event.total_insurer_capital == sum(allocations to event)`
//! 5. **Escrow**: each holder's `locked_as_policyholder_funds == sum(pending_premiums)`
//!    and each event's `accumulated_premiums == sum(pending_premiums of its policies)`

use crate::core::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::math::{self, Amount};
use crate::core::time::LedgerClock;
use crate::events::EventRegistry;
use crate::ledger::{Ledger, LockKind};
use crate::policy::PolicyBook;
use crate::pools::{CapitalPool, ReinsurancePool};
use crate::pricing::RiskPricingEngine;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub(crate) ledger: Ledger,
    pub(crate) capital: CapitalPool,
    pub(crate) reinsurance: ReinsurancePool,
    pub(crate) events: EventRegistry,
    pub(crate) policies: PolicyBook,
    pub(crate) pricing: RiskPricingEngine,
    pub(crate) clock: LedgerClock,
}

impl PoolState {
    pub fn new(risk_loading_bps: u64) -> Self {
        Self {
            ledger: Ledger::new(),
            capital: CapitalPool::new(),
            reinsurance: ReinsurancePool::new(),
            events: EventRegistry::new(),
            policies: PolicyBook::new(),
            pricing: RiskPricingEngine::new(risk_loading_bps),
            clock: LedgerClock::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn capital_pool(&self) -> &CapitalPool {
        &self.capital
    }

    pub fn reinsurance_pool(&self) -> &ReinsurancePool {
        &self.reinsurance
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn policies(&self) -> &PolicyBook {
        &self.policies
    }

    pub fn pricing(&self) -> &RiskPricingEngine {
        &self.pricing
    }

    pub fn clock(&self) -> &LedgerClock {
        &self.clock
    }

    /// Check every cross-component invariant
    ///
    /// Returns a description of the first violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if !self.ledger.is_conserved() {
            return Err(format!(
                "ledger not conserved: balances {:?} + fees {} vs liquidity {}",
                self.ledger.total_balances().ok(),
                self.ledger.protocol_fees(),
                self.ledger.total_system_liquidity()
            ));
        }

        for insurer in self.capital.insurers() {
            let locked = self.locked(insurer.id(), LockKind::Insurer);
            if locked != insurer.total_collateral() {
                return Err(format!(
                    "insurer {} locks {} but holds collateral {}",
                    insurer.id(),
                    locked,
                    insurer.total_collateral()
                ));
            }
            let allocated = math::sum(insurer.allocations().values().copied())
                .map_err(|e| e.to_string())?;
            if allocated != insurer.consumed_capital() || allocated > insurer.total_collateral() {
                return Err(format!(
                    "insurer {} allocations {} inconsistent with consumed {}",
                    insurer.id(),
                    allocated,
                    insurer.consumed_capital()
                ));
            }
        }

        for reinsurer in self.reinsurance.reinsurers() {
            let locked = self.locked(reinsurer.id(), LockKind::Reinsurer);
            if locked != reinsurer.deployable() {
                return Err(format!(
                    "reinsurer {} locks {} but has deployable {}",
                    reinsurer.id(),
                    locked,
                    reinsurer.deployable()
                ));
            }
        }

        let mut escrow_by_holder: BTreeMap<&str, Amount> = BTreeMap::new();
        let mut escrow_by_event: BTreeMap<u64, Amount> = BTreeMap::new();
        for policy in self.policies.policies() {
            let held = escrow_by_holder.entry(policy.holder.as_str()).or_insert(0);
            *held = math::add(*held, policy.pending_premiums).map_err(|e| e.to_string())?;
            let pooled = escrow_by_event.entry(policy.event_id).or_insert(0);
            *pooled = math::add(*pooled, policy.pending_premiums).map_err(|e| e.to_string())?;
        }
        for participant in self.ledger.participants() {
            let pending = escrow_by_holder.get(participant.id()).copied().unwrap_or(0);
            let locked = participant.locked(LockKind::PolicyholderFunds);
            if locked != pending {
                return Err(format!(
                    "holder {} escrow {} vs pending premiums {}",
                    participant.id(),
                    locked,
                    pending
                ));
            }
        }

        for event in self.events.events() {
            let capital = self
                .capital
                .event_capital(event.id)
                .map_err(|e| e.to_string())?;
            if capital != event.total_insurer_capital {
                return Err(format!(
                    "event {} records insurer capital {} but allocations sum to {}",
                    event.id, event.total_insurer_capital, capital
                ));
            }
            let pending = escrow_by_event.get(&event.id).copied().unwrap_or(0);
            if pending != event.accumulated_premiums {
                return Err(format!(
                    "event {} accumulated {} but policies hold {}",
                    event.id, event.accumulated_premiums, pending
                ));
            }
        }

        Ok(())
    }

    /// Refresh the cached risk aggregate from live totals
    pub(crate) fn recompute_risk(&mut self, config: &PoolConfig) -> Result<(), PoolError> {
        self.pricing
            .recompute(&self.capital, &self.reinsurance, &self.events, config)
    }

    fn locked(&self, id: &str, kind: LockKind) -> Amount {
        self.ledger.participant(id).map_or(0, |p| p.locked(kind))
    }
}
