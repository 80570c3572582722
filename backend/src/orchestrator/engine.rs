//! Pool engine
//!
//! Composes the ledger, both capital pools, the event registry, the policy
//! book and the pricing engine into one sequential state machine.
//!
//! # Transactions
//!
//! Every mutating operation runs against a draft copy of [`PoolState`]:
//!
//! ```text
//! 1. Clone state into a draft
//! 2. Advance the clock (rejects time going backwards)
//! 3. Apply the operation to the draft
//! 4. Call the payment asset (always the last fallible step)
//! 5. Commit draft + append activities
//! ```
//!
//! Any error before step 5 drops the draft, so failed calls leave no partial
//! effects. Distribution and claim operations live in `distribution.rs`.
//!
//! # Example
//!
//! ```rust
//! use riskpool_core_rs::{InMemoryAsset, PoolConfig, PoolEngine};
//!
//! let config = PoolConfig {
//!     min_collateral: 1_000,
//!     registrars: vec!["ORACLE".to_string()],
//!     ..PoolConfig::default()
//! };
//! let mut asset = InMemoryAsset::new();
//! asset.mint("INSURER", 10_000);
//!
//! let mut engine = PoolEngine::new(config, asset).unwrap();
//! engine.deposit("INSURER", 10_000, 0).unwrap();
//! engine.register_insurer("INSURER", 10_000, 0).unwrap();
//! let event = engine
//!     .register_event("ORACLE", "BTC -20%", "30-day drawdown", 2_000, 500, 0)
//!     .unwrap();
//! engine.allocate_to_event("INSURER", event, 10_000, 0).unwrap();
//!
//! assert_eq!(engine.event(event).unwrap().total_insurer_capital, 10_000);
//! assert!(engine.reconcile().consistent);
//! ```

use crate::core::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::math::{self, Amount, Bps};
use crate::core::time::Timestamp;
use crate::ledger::{PaymentAsset, Participant};
use crate::models::activity::{Activity, ActivityLog, CapitalRole};
use crate::models::event::{Event, EventId, RiskParameters};
use crate::models::insurer::InsurerAccount;
use crate::models::policy::{Policy, PolicyId};
use crate::models::reinsurer::ReinsurerAccount;
use crate::models::state::PoolState;
use crate::orchestrator::distribution;
use crate::events::EventError;
use crate::pricing::ReinsuranceState;
use serde::{Deserialize, Serialize};

/// Working copy of the state handed to an operation
pub(crate) struct Draft<'a, A> {
    pub state: PoolState,
    pub config: &'a PoolConfig,
    pub asset: &'a mut A,
    pub now: Timestamp,
    activities: Vec<Activity>,
}

impl<A> Draft<'_, A> {
    pub fn log(&mut self, activity: Activity) {
        self.activities.push(activity);
    }
}

/// Outcome of [`PoolEngine::reconcile`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub total_system_liquidity: Amount,
    pub total_balances: Amount,
    pub protocol_fees: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    /// Funds held by the payment asset, when it can report them
    pub custody: Option<Amount>,
    pub consistent: bool,
    /// First invariant violation found, if any
    pub issue: Option<String>,
}

/// Risk pool state machine over a payment asset `A`
#[derive(Debug, Clone)]
pub struct PoolEngine<A> {
    config: PoolConfig,
    state: PoolState,
    asset: A,
    activity_log: ActivityLog,
}

impl<A: PaymentAsset> PoolEngine<A> {
    /// Create an empty pool
    ///
    /// Fails with `PoolError::Config` if the config does not validate.
    pub fn new(config: PoolConfig, asset: A) -> Result<Self, PoolError> {
        config.validate()?;
        tracing::info!(
            min_collateral = %config.min_collateral,
            lockup_period_secs = config.lockup_period_secs,
            insurer_claim_share_bps = config.insurer_claim_share_bps,
            "Pool engine created"
        );
        Ok(Self {
            state: PoolState::new(config.risk_loading_bps),
            config,
            asset,
            activity_log: ActivityLog::new(),
        })
    }

    pub(crate) fn from_parts(config: PoolConfig, state: PoolState, asset: A, activity_log: ActivityLog) -> Self {
        Self {
            config,
            state,
            asset,
            activity_log,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn asset(&self) -> &A {
        &self.asset
    }

    /// Direct access to the payment asset (funding external wallets)
    pub fn asset_mut(&mut self) -> &mut A {
        &mut self.asset
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity_log
    }

    /// Latest timestamp accepted by the engine
    pub fn last_seen(&self) -> Option<Timestamp> {
        self.state.clock.last_seen()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.state.ledger.participant(id)
    }

    pub fn available_balance(&self, id: &str) -> Amount {
        self.state.ledger.available(id)
    }

    pub fn insurer(&self, id: &str) -> Option<&InsurerAccount> {
        self.state.capital.insurer(id)
    }

    pub fn reinsurer(&self, id: &str) -> Option<&ReinsurerAccount> {
        self.state.reinsurance.reinsurer(id)
    }

    /// Allocation of `insurer` to `event_id` (zero when none)
    pub fn allocation(&self, insurer: &str, event_id: EventId) -> Amount {
        self.state
            .capital
            .insurer(insurer)
            .map_or(0, |a| a.allocation(event_id))
    }

    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.state.events.event(id)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.state.events.events()
    }

    pub fn policy(&self, id: PolicyId) -> Option<&Policy> {
        self.state.policies.policy(id)
    }

    pub fn policies_for_event(&self, event_id: EventId) -> Vec<PolicyId> {
        self.state.policies.policies_for_event(event_id)
    }

    pub fn reinsurance_state(&self) -> &ReinsuranceState {
        self.state.pricing.state()
    }

    pub fn protocol_fees(&self) -> Amount {
        self.state.ledger.protocol_fees()
    }

    pub fn total_system_liquidity(&self) -> Amount {
        self.state.ledger.total_system_liquidity()
    }

    /// Part of `holder`'s available balance withdrawals must leave in place
    ///
    /// Premium for `policy_reserve_window_secs` on every in-force policy whose
    /// event is still open.
    pub fn policy_reserve(&self, holder: &str) -> Result<Amount, PoolError> {
        policy_reserve(&self.state, &self.config, holder)
    }

    /// Check conservation, reconciliation and cross-component invariants
    pub fn reconcile(&self) -> ReconciliationReport {
        let ledger = &self.state.ledger;
        let custody = self.asset.custody();
        let mut issue = self.state.check_invariants().err();
        if issue.is_none() {
            if let Some(held) = custody {
                if held != ledger.total_system_liquidity() {
                    issue = Some(format!(
                        "asset custody {} differs from liquidity {}",
                        held,
                        ledger.total_system_liquidity()
                    ));
                }
            }
        }
        if let Some(problem) = &issue {
            tracing::warn!(issue = %problem, "Reconciliation failed");
        }

        ReconciliationReport {
            total_system_liquidity: ledger.total_system_liquidity(),
            total_balances: ledger.total_balances().unwrap_or(Amount::MAX),
            protocol_fees: ledger.protocol_fees(),
            total_deposited: ledger.total_deposited(),
            total_withdrawn: ledger.total_withdrawn(),
            custody,
            consistent: issue.is_none(),
            issue,
        }
    }

    // ========================================================================
    // Ledger operations
    // ========================================================================

    /// Move funds from the participant's external wallet into the pool
    pub fn deposit(&mut self, participant: &str, amount: Amount, now: Timestamp) -> Result<Amount, PoolError> {
        let available = self.transact(now, |tx| {
            let available = tx.state.ledger.deposit(participant, amount)?;
            tx.asset.transfer_in(participant, amount)?;
            tx.log(Activity::Deposit {
                time: now,
                participant: participant.to_string(),
                amount,
            });
            Ok(available)
        })?;
        tracing::debug!(participant, amount = %amount, available = %available, "Deposit");
        Ok(available)
    }

    /// Move available funds back to the participant's external wallet
    pub fn withdraw(&mut self, participant: &str, amount: Amount, now: Timestamp) -> Result<Amount, PoolError> {
        let remaining = self.transact(now, |tx| {
            let reserved = policy_reserve(&tx.state, tx.config, participant)?;
            let remaining = tx.state.ledger.withdraw(participant, amount, reserved)?;
            tx.asset.transfer_out(participant, amount)?;
            tx.log(Activity::Withdraw {
                time: now,
                participant: participant.to_string(),
                amount,
            });
            Ok(remaining)
        })?;
        tracing::debug!(participant, amount = %amount, remaining = %remaining, "Withdraw");
        Ok(remaining)
    }

    /// Pay accrued protocol fees to `recipient` (registrar only)
    pub fn withdraw_protocol_fees(
        &mut self,
        caller: &str,
        recipient: &str,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), PoolError> {
        self.authorize(caller)?;
        self.transact(now, |tx| {
            tx.state.ledger.withdraw_protocol_fees(amount)?;
            tx.asset.transfer_out(recipient, amount)?;
            tx.log(Activity::ProtocolFeesWithdrawn {
                time: now,
                recipient: recipient.to_string(),
                amount,
            });
            Ok(())
        })?;
        tracing::info!(recipient, amount = %amount, "Protocol fees withdrawn");
        Ok(())
    }

    // ========================================================================
    // Capital operations
    // ========================================================================

    pub fn register_insurer(&mut self, participant: &str, collateral: Amount, now: Timestamp) -> Result<(), PoolError> {
        self.transact(now, |tx| {
            let min = tx.config.min_collateral;
            let state = &mut tx.state;
            state.capital.register(&mut state.ledger, participant, collateral, min)?;
            state.recompute_risk(tx.config)?;
            tx.log(Activity::CapitalRegistered {
                time: now,
                participant: participant.to_string(),
                role: CapitalRole::Insurer,
                collateral,
            });
            Ok(())
        })?;
        tracing::info!(participant, collateral = %collateral, "Insurer registered");
        Ok(())
    }

    pub fn register_reinsurer(&mut self, participant: &str, collateral: Amount, now: Timestamp) -> Result<(), PoolError> {
        self.transact(now, |tx| {
            let min = tx.config.min_collateral;
            let state = &mut tx.state;
            state
                .reinsurance
                .register(&mut state.ledger, participant, collateral, min)?;
            state.recompute_risk(tx.config)?;
            tx.log(Activity::CapitalRegistered {
                time: now,
                participant: participant.to_string(),
                role: CapitalRole::Reinsurer,
                collateral,
            });
            Ok(())
        })?;
        tracing::info!(participant, collateral = %collateral, "Reinsurer registered");
        Ok(())
    }

    /// Top up insurer collateral; returns the new total
    pub fn add_insurer_capital(&mut self, participant: &str, amount: Amount, now: Timestamp) -> Result<Amount, PoolError> {
        self.transact(now, |tx| {
            let state = &mut tx.state;
            let new_total = state.capital.add_capital(&mut state.ledger, participant, amount)?;
            state.recompute_risk(tx.config)?;
            tx.log(Activity::CapitalAdded {
                time: now,
                participant: participant.to_string(),
                role: CapitalRole::Insurer,
                amount,
                new_total,
            });
            Ok(new_total)
        })
    }

    /// Top up reinsurer collateral; returns the new total
    pub fn add_reinsurer_capital(&mut self, participant: &str, amount: Amount, now: Timestamp) -> Result<Amount, PoolError> {
        self.transact(now, |tx| {
            let state = &mut tx.state;
            let new_total = state
                .reinsurance
                .add_capital(&mut state.ledger, participant, amount)?;
            state.recompute_risk(tx.config)?;
            tx.log(Activity::CapitalAdded {
                time: now,
                participant: participant.to_string(),
                role: CapitalRole::Reinsurer,
                amount,
                new_total,
            });
            Ok(new_total)
        })
    }

    /// Commit insurer collateral to an open event; returns the event's capital
    pub fn allocate_to_event(
        &mut self,
        insurer: &str,
        event_id: EventId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Amount, PoolError> {
        let event_capital = self.transact(now, |tx| {
            tx.state.events.get_open(event_id)?;
            tx.state.capital.allocate_to_event(insurer, event_id, amount)?;
            let event_capital = sync_event_capital(&mut tx.state, event_id)?;
            tx.state.recompute_risk(tx.config)?;
            tx.log(Activity::Allocated {
                time: now,
                participant: insurer.to_string(),
                event_id,
                amount,
                event_capital,
            });
            Ok(event_capital)
        })?;
        tracing::info!(insurer, event_id, amount = %amount, event_capital = %event_capital, "Capital allocated");
        Ok(event_capital)
    }

    /// Release an allocation; returns the event's remaining capital
    ///
    /// Allowed while the event is open, or after trigger once every claim
    /// has been settled.
    pub fn remove_from_event(
        &mut self,
        insurer: &str,
        event_id: EventId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Amount, PoolError> {
        let event_capital = self.transact(now, |tx| {
            let event = tx.state.events.get(event_id)?;
            if event.is_triggered {
                let outstanding = tx
                    .state
                    .policies
                    .policies_for_event(event_id)
                    .into_iter()
                    .filter_map(|id| tx.state.policies.policy(id))
                    .any(Policy::is_in_force);
                if outstanding {
                    return Err(EventError::ClaimsOutstanding(event_id).into());
                }
            }
            tx.state.capital.remove_from_event(insurer, event_id, amount)?;
            let event_capital = sync_event_capital(&mut tx.state, event_id)?;
            tx.state.recompute_risk(tx.config)?;
            tx.log(Activity::Deallocated {
                time: now,
                participant: insurer.to_string(),
                event_id,
                amount,
                event_capital,
            });
            Ok(event_capital)
        })?;
        tracing::info!(insurer, event_id, amount = %amount, event_capital = %event_capital, "Capital deallocated");
        Ok(event_capital)
    }

    // ========================================================================
    // Event administration (registrar only)
    // ========================================================================

    pub fn register_event(
        &mut self,
        caller: &str,
        name: &str,
        description: &str,
        trigger_threshold_bps: Bps,
        base_premium_bps: Bps,
        now: Timestamp,
    ) -> Result<EventId, PoolError> {
        self.authorize(caller)?;
        let event_id = self.transact(now, |tx| {
            let event_id = tx.state.events.register_event(
                name,
                description,
                trigger_threshold_bps,
                base_premium_bps,
                tx.config,
                now,
            )?;
            tx.state.recompute_risk(tx.config)?;
            tx.log(Activity::EventRegistered {
                time: now,
                event_id,
                name: name.to_string(),
            });
            Ok(event_id)
        })?;
        tracing::info!(event_id, name, base_premium_bps, "Event registered");
        Ok(event_id)
    }

    /// Accept the oracle's trigger for `event_id`
    ///
    /// Premiums accrued up to `now` are collected into escrow before the
    /// event closes; later calls to `distribute_event_premiums` release them.
    pub fn trigger_event(&mut self, caller: &str, event_id: EventId, now: Timestamp) -> Result<(), PoolError> {
        self.authorize(caller)?;
        self.transact(now, |tx| {
            if tx.state.events.get(event_id)?.is_open() {
                distribution::collect(tx, event_id)?;
            }
            tx.state.events.trigger(event_id, now)?;
            tx.state.recompute_risk(tx.config)?;
            tx.log(Activity::EventTriggered { time: now, event_id });
            Ok(())
        })?;
        tracing::info!(event_id, time = now, "Event triggered");
        Ok(())
    }

    pub fn set_risk_parameters(
        &mut self,
        caller: &str,
        event_id: EventId,
        risk: RiskParameters,
        now: Timestamp,
    ) -> Result<(), PoolError> {
        self.authorize(caller)?;
        self.transact(now, |tx| {
            tx.state.events.set_risk_parameters(event_id, risk)?;
            tx.state.recompute_risk(tx.config)?;
            tx.log(Activity::RiskParametersUpdated { time: now, event_id });
            Ok(())
        })?;
        tracing::info!(
            event_id,
            expected_loss_ratio_bps = risk.expected_loss_ratio_bps,
            total_loss_ratio_bps = risk.total_loss_ratio_bps,
            max_premium_bps = risk.max_premium_bps,
            "Risk parameters updated"
        );
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn authorize(&self, caller: &str) -> Result<(), PoolError> {
        if self.config.is_registrar(caller) {
            Ok(())
        } else {
            tracing::warn!(caller, "Unauthorized registrar call");
            Err(PoolError::Unauthorized {
                participant: caller.to_string(),
            })
        }
    }

    /// Run `op` on a draft and commit it only if `op` succeeds
    ///
    /// The draft is a full clone of [`PoolState`], so every mutating call
    /// costs O(participants + policies + events). A failed call leaves the
    /// committed state untouched.
    pub(crate) fn transact<T>(
        &mut self,
        now: Timestamp,
        op: impl FnOnce(&mut Draft<'_, A>) -> Result<T, PoolError>,
    ) -> Result<T, PoolError> {
        let mut state = self.state.clone();
        state.clock.observe(now)?;

        let mut draft = Draft {
            state,
            config: &self.config,
            asset: &mut self.asset,
            now,
            activities: Vec::new(),
        };
        let output = op(&mut draft)?;

        let Draft {
            state, activities, ..
        } = draft;
        self.state = state;
        for activity in activities {
            self.activity_log.log(activity);
        }
        Ok(output)
    }
}

/// Copy the capital pool's allocation total into the event record
pub(crate) fn sync_event_capital(state: &mut PoolState, event_id: EventId) -> Result<Amount, PoolError> {
    let capital = state.capital.event_capital(event_id)?;
    state.events.set_insurer_capital(event_id, capital)?;
    Ok(capital)
}

pub(crate) fn policy_reserve(state: &PoolState, config: &PoolConfig, holder: &str) -> Result<Amount, PoolError> {
    let window = Amount::from(config.policy_reserve_window_secs);
    let mut reserve: Amount = 0;
    for policy in state.policies.policies_of(holder) {
        let open = state.events.event(policy.event_id).is_some_and(Event::is_open);
        if policy.is_in_force() && open {
            reserve = math::add(reserve, math::mul(policy.premium_per_second(), window)?)?;
        }
    }
    Ok(reserve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::ledger::InMemoryAsset;

    fn engine() -> PoolEngine<InMemoryAsset> {
        let config = PoolConfig {
            min_collateral: 100,
            registrars: vec!["ORACLE".to_string()],
            ..PoolConfig::default()
        };
        let mut asset = InMemoryAsset::new();
        asset.mint("ALICE", 10_000);
        asset.mint("INSURER", 10_000);
        PoolEngine::new(config, asset).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PoolConfig {
            insurer_claim_share_bps: 10_001,
            ..PoolConfig::default()
        };
        assert!(matches!(
            PoolEngine::new(config, InMemoryAsset::new()),
            Err(PoolError::Config(_))
        ));
    }

    #[test]
    fn test_failed_asset_transfer_rolls_back() {
        let mut engine = engine();
        let err = engine.deposit("ALICE", 10_001, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert!(engine.participant("ALICE").is_none());
        assert_eq!(engine.total_system_liquidity(), 0);
        assert!(engine.activity_log().is_empty());
    }

    #[test]
    fn test_time_cannot_go_backwards() {
        let mut engine = engine();
        engine.deposit("ALICE", 100, 50).unwrap();
        assert!(matches!(
            engine.deposit("ALICE", 100, 49),
            Err(PoolError::Clock(_))
        ));
        assert_eq!(engine.available_balance("ALICE"), 100);
        assert_eq!(engine.last_seen(), Some(50));
    }

    #[test]
    fn test_registrar_capability() {
        let mut engine = engine();
        let err = engine
            .register_event("ALICE", "E", "", 2_000, 500, 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(engine.register_event("ORACLE", "E", "", 2_000, 500, 0), Ok(1));
    }

    #[test]
    fn test_allocation_updates_event_and_risk_state() {
        let mut engine = engine();
        engine.deposit("INSURER", 5_000, 0).unwrap();
        engine.register_insurer("INSURER", 5_000, 0).unwrap();
        let event = engine.register_event("ORACLE", "E", "", 2_000, 500, 0).unwrap();

        assert_eq!(engine.allocate_to_event("INSURER", event, 3_000, 1), Ok(3_000));
        assert_eq!(engine.allocation("INSURER", event), 3_000);
        assert_eq!(engine.reinsurance_state().total_capital, 5_000);
        assert_eq!(engine.remove_from_event("INSURER", event, 1_000, 2), Ok(2_000));
        assert_eq!(engine.event(event).unwrap().total_insurer_capital, 2_000);
        assert!(engine.reconcile().consistent);
    }

    #[test]
    fn test_allocation_to_unknown_event() {
        let mut engine = engine();
        engine.deposit("INSURER", 5_000, 0).unwrap();
        engine.register_insurer("INSURER", 5_000, 0).unwrap();
        assert_eq!(
            engine.allocate_to_event("INSURER", 42, 1_000, 0),
            Err(PoolError::Event(EventError::UnknownEvent(42)))
        );
        assert_eq!(engine.insurer("INSURER").unwrap().consumed_capital(), 0);
    }
}
