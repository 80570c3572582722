//! Distribution coordinator
//!
//! Policy purchase and activation, continuous premium collection, premium
//! distribution between the pools, and claim settlement.
//!
//! # Premium flow
//!
//! ```text
//! holder.available --collect--> holder.locked_as_policyholder_funds
//!                               (policy.pending_premiums, event.accumulated_premiums)
//!                  --distribute--> insurers | reinsurers | caller reward | protocol fees
//! ```
//!
//! # Claim flow
//!
//! ```text
//! insurers.locked_as_insurer  (insurer_claim_share of payouts)  \
//!                                                                 --> holder.available
//! reinsurers.locked_as_reinsurer (rest, capped at deployable)    /
//! ```
//!
//! Both flows debit exactly what they credit, so conservation holds after
//! every operation.

use crate::core::error::{DistributionError, PoolError};
use crate::core::math::{self, Amount};
use crate::core::time::{elapsed, Timestamp};
use crate::events::EventError;
use crate::ledger::{LockKind, PaymentAsset};
use crate::models::activity::Activity;
use crate::models::event::EventId;
use crate::models::policy::PolicyId;
use crate::orchestrator::engine::{sync_event_capital, Draft, PoolEngine};
use crate::policy::PolicyError;
use crate::pricing::PremiumQuote;
use serde::{Deserialize, Serialize};

/// Outcome of a premium collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub event_id: EventId,
    pub collected: Amount,
    pub policies_charged: usize,
    /// Policies whose holder could not cover the accrual
    pub policies_skipped: usize,
}

/// Outcome of a premium distribution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionResult {
    pub event_id: EventId,
    /// Escrow released by this distribution
    pub distributed: Amount,
    pub insurer_share: Amount,
    pub reinsurer_share: Amount,
    /// Protocol fee plus truncation dust
    pub protocol_fee: Amount,
    pub caller_reward: Amount,
}

/// Outcome of claim settlement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub event_id: EventId,
    pub policies_paid: usize,
    pub total_payouts: Amount,
    pub insurer_consumed: Amount,
    pub reinsurer_consumed: Amount,
}

impl<A: PaymentAsset> PoolEngine<A> {
    /// Annualized premium a new policy of `coverage` would pay
    pub fn quote_premium(&self, event_id: EventId, coverage: Amount) -> Result<PremiumQuote, PoolError> {
        let event = self.state().events.get_open(event_id)?;
        self.state().pricing.quote(event, coverage)
    }

    /// Buy coverage on an open event
    ///
    /// The holder must show `max_loss_limit` of available balance. The policy
    /// activates no earlier than `now + lockup_period_secs`.
    pub fn buy_policy(
        &mut self,
        holder: &str,
        event_id: EventId,
        coverage: Amount,
        max_loss_limit: Amount,
        now: Timestamp,
    ) -> Result<PolicyId, PoolError> {
        let (policy_id, annualized_premium) = self.transact(now, |tx| {
            if coverage == 0 {
                return Err(PolicyError::ZeroCoverage.into());
            }
            let event = tx.state.events.get_open(event_id)?;
            if event.total_insurer_capital == 0 {
                return Err(PolicyError::NoCapitalBacking(event_id).into());
            }
            let available = tx.state.ledger.available(holder);
            if available < max_loss_limit {
                return Err(PolicyError::InsufficientFundsForPolicy {
                    required: max_loss_limit,
                    available,
                }
                .into());
            }

            let quote = tx.state.pricing.quote(event, coverage)?;
            let policy_id = tx.state.policies.create(
                holder,
                event_id,
                coverage,
                quote.annualized_premium,
                max_loss_limit,
                now,
                tx.config.lockup_period_secs,
            )?;
            tx.state.events.add_coverage(event_id, coverage)?;
            tx.state.recompute_risk(tx.config)?;
            tx.log(Activity::PolicyPurchased {
                time: now,
                policy_id,
                holder: holder.to_string(),
                event_id,
                coverage,
                annualized_premium: quote.annualized_premium,
            });
            Ok((policy_id, quote.annualized_premium))
        })?;
        tracing::info!(
            policy_id,
            holder,
            event_id,
            coverage = %coverage,
            annualized_premium = %annualized_premium,
            "Policy purchased"
        );
        Ok(policy_id)
    }

    /// Activate a policy once its lockup has expired
    pub fn activate_policy(&mut self, holder: &str, policy_id: PolicyId, now: Timestamp) -> Result<(), PoolError> {
        self.transact(now, |tx| {
            let event_id = tx.state.policies.get(policy_id)?.event_id;
            tx.state.events.get_open(event_id)?;
            tx.state.policies.activate(holder, policy_id, now)?;
            tx.log(Activity::PolicyActivated {
                time: now,
                policy_id,
                holder: holder.to_string(),
            });
            Ok(())
        })?;
        tracing::info!(policy_id, holder, "Policy activated");
        Ok(())
    }

    /// Accrue premiums on every in-force policy of an open event
    ///
    /// Safe to call any number of times: each policy is charged for the time
    /// since its last successful collection only.
    pub fn collect_ongoing_premiums(&mut self, event_id: EventId, now: Timestamp) -> Result<CollectionResult, PoolError> {
        self.transact(now, |tx| collect(tx, event_id))
    }

    /// Split an event's accumulated premiums between the pools
    pub fn distribute_event_premiums(&mut self, event_id: EventId, now: Timestamp) -> Result<DistributionResult, PoolError> {
        self.transact(now, |tx| distribute(tx, event_id, None))
    }

    /// Rate-limited collect-and-distribute open to any caller
    ///
    /// The caller receives `gratification_bps` of the distributed amount.
    /// Fails with `TooEarly` until `interval` seconds have passed since the
    /// event's last distribution.
    pub fn distribute_periodically(
        &mut self,
        caller: &str,
        event_id: EventId,
        interval: u64,
        now: Timestamp,
    ) -> Result<DistributionResult, PoolError> {
        let minimum = self.config().min_distribution_interval_secs;
        if interval < minimum {
            return Err(DistributionError::IntervalBelowMinimum { interval, minimum }.into());
        }
        self.transact(now, |tx| {
            let event = tx.state.events.get(event_id)?;
            if let Some(last) = event.last_distribution_time {
                let next_allowed = last.saturating_add(interval);
                if now < next_allowed {
                    return Err(DistributionError::TooEarly { next_allowed }.into());
                }
            }
            if event.is_open() {
                collect(tx, event_id)?;
            }
            distribute(tx, event_id, Some(caller))
        })
    }

    /// Pay every in-force policy of a triggered event
    ///
    /// Fails with the fatal `InsufficientInsurerCapital` when the event's
    /// insurer capital cannot cover the payouts. Calling it again after a
    /// successful settlement pays nothing.
    pub fn settle_claims(&mut self, event_id: EventId, now: Timestamp) -> Result<SettlementResult, PoolError> {
        let result = self.transact(now, |tx| settle(tx, event_id));
        match &result {
            Ok(settled) if settled.policies_paid > 0 => tracing::info!(
                event_id,
                policies_paid = settled.policies_paid,
                total_payouts = %settled.total_payouts,
                insurer_consumed = %settled.insurer_consumed,
                reinsurer_consumed = %settled.reinsurer_consumed,
                "Claims settled"
            ),
            Err(e) if e.is_fatal() => {
                tracing::error!(event_id, error = %e, "Claim settlement needs operator intervention")
            }
            _ => {}
        }
        result
    }
}

pub(crate) fn collect<A>(tx: &mut Draft<'_, A>, event_id: EventId) -> Result<CollectionResult, PoolError> {
    tx.state.events.get_open(event_id)?;
    let now = tx.now;
    let mut result = CollectionResult {
        event_id,
        ..CollectionResult::default()
    };

    for policy_id in tx.state.policies.policies_for_event(event_id) {
        let policy = tx.state.policies.get(policy_id)?;
        if !policy.is_in_force() {
            continue;
        }
        let since = policy.last_premium_collection.unwrap_or(policy.activation_time);
        let accrual = policy.accrual_for(elapsed(since, now))?;
        if accrual == 0 {
            continue;
        }
        let holder = policy.holder.clone();

        let available = tx.state.ledger.available(&holder);
        if available < accrual {
            tracing::warn!(
                policy_id,
                holder = %holder,
                accrual = %accrual,
                available = %available,
                "Premium collection skipped"
            );
            result.policies_skipped += 1;
            continue;
        }

        tx.state.ledger.lock(&holder, LockKind::PolicyholderFunds, accrual)?;
        tx.state.policies.record_collection(policy_id, accrual, now)?;
        result.collected = math::add(result.collected, accrual)?;
        result.policies_charged += 1;
    }

    if result.collected > 0 {
        tx.state.events.accumulate_premiums(event_id, result.collected)?;
    }
    if result.policies_charged + result.policies_skipped > 0 {
        tx.log(Activity::PremiumsCollected {
            time: now,
            event_id,
            amount: result.collected,
            policies_charged: result.policies_charged,
            policies_skipped: result.policies_skipped,
        });
        tracing::debug!(
            event_id,
            collected = %result.collected,
            charged = result.policies_charged,
            skipped = result.policies_skipped,
            "Premiums collected"
        );
    }
    Ok(result)
}

fn distribute<A>(tx: &mut Draft<'_, A>, event_id: EventId, caller: Option<&str>) -> Result<DistributionResult, PoolError> {
    let now = tx.now;
    let event = tx.state.events.get(event_id)?.clone();

    // Release every policy's escrow on this event
    let mut released: Amount = 0;
    for policy_id in tx.state.policies.policies_for_event(event_id) {
        let pending = tx.state.policies.take_pending(policy_id)?;
        if pending == 0 {
            continue;
        }
        let holder = tx.state.policies.get(policy_id)?.holder.clone();
        tx.state
            .ledger
            .debit_locked(&holder, LockKind::PolicyholderFunds, pending)?;
        released = math::add(released, pending)?;
    }
    tx.state.events.clear_accumulated_premiums(event_id)?;

    let caller_reward = match caller {
        Some(_) => math::apply_bps(released, tx.config.gratification_bps)?,
        None => 0,
    };
    let fee = math::apply_bps(released, tx.config.protocol_fee_bps)?;
    let distributable = math::sub(released, math::add(caller_reward, fee)?)?;

    let split = tx.state.pricing.split_premiums(&event, distributable)?;
    let state = &mut tx.state;
    let insurer_share = state
        .capital
        .credit_premiums(&mut state.ledger, event_id, split.insurer_share)?;
    let reinsurer_share = state
        .reinsurance
        .credit_premiums(&mut state.ledger, split.reinsurer_share)?;
    if let Some(caller) = caller {
        state.ledger.credit(caller, caller_reward)?;
    }

    let dust = math::sub(distributable, math::add(insurer_share, reinsurer_share)?)?;
    let protocol_fee = math::add(fee, dust)?;
    state.ledger.accrue_protocol_fees(protocol_fee)?;
    state.events.mark_distributed(event_id, now)?;
    state.recompute_risk(tx.config)?;

    let result = DistributionResult {
        event_id,
        distributed: released,
        insurer_share,
        reinsurer_share,
        protocol_fee,
        caller_reward,
    };
    tx.log(Activity::PremiumsDistributed {
        time: now,
        event_id,
        insurer_share,
        reinsurer_share,
        protocol_fee,
        caller_reward,
        caller: caller.map(str::to_string),
    });
    tracing::info!(
        event_id,
        distributed = %released,
        insurer_share = %insurer_share,
        reinsurer_share = %reinsurer_share,
        protocol_fee = %protocol_fee,
        caller_reward = %caller_reward,
        "Premiums distributed"
    );
    Ok(result)
}

fn settle<A>(tx: &mut Draft<'_, A>, event_id: EventId) -> Result<SettlementResult, PoolError> {
    let now = tx.now;
    let event = tx.state.events.get(event_id)?;
    if !event.is_triggered {
        return Err(EventError::NotTriggered(event_id).into());
    }
    let allocated = event.total_insurer_capital;

    let mut claims: Vec<(PolicyId, String, Amount)> = Vec::new();
    for policy_id in tx.state.policies.policies_for_event(event_id) {
        let policy = tx.state.policies.get(policy_id)?;
        if policy.is_in_force() {
            claims.push((policy_id, policy.holder.clone(), policy.coverage));
        }
    }
    let mut result = SettlementResult {
        event_id,
        ..SettlementResult::default()
    };
    if claims.is_empty() {
        return Ok(result);
    }

    let payouts = math::sum(claims.iter().map(|(_, _, coverage)| *coverage))?;
    if allocated < payouts {
        return Err(DistributionError::InsufficientInsurerCapital {
            event_id,
            allocated,
            payouts,
        }
        .into());
    }

    // Reinsurer part capped at what reinsurers can absorb; insurers cover the rest
    let insurer_part = math::apply_bps(payouts, tx.config.insurer_claim_share_bps)?;
    let reinsurer_part = payouts - insurer_part;
    let state = &mut tx.state;
    let reinsurer_take = reinsurer_part.min(state.reinsurance.deployable_capital()?);
    let insurer_take = payouts - reinsurer_take;

    state
        .capital
        .consume_for_claim(&mut state.ledger, event_id, insurer_take)?;
    state
        .reinsurance
        .consume_for_claim(&mut state.ledger, reinsurer_take)?;

    for (policy_id, holder, coverage) in &claims {
        state.policies.mark_claimed(*policy_id)?;
        state.ledger.credit(holder, *coverage)?;
    }
    sync_event_capital(state, event_id)?;
    state.events.record_payouts(event_id, payouts)?;
    state.recompute_risk(tx.config)?;

    result.policies_paid = claims.len();
    result.total_payouts = payouts;
    result.insurer_consumed = insurer_take;
    result.reinsurer_consumed = reinsurer_take;
    tx.log(Activity::ClaimsSettled {
        time: now,
        event_id,
        policies_paid: result.policies_paid,
        total_payouts: payouts,
        insurer_consumed: insurer_take,
        reinsurer_consumed: reinsurer_take,
    });
    Ok(result)
}
