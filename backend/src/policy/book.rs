//! Policy book
//!
//! Policies are keyed by id and indexed by `(event_id, holder)` so the
//! premium-collection scan walks one event's policies in holder order.
//!
//! # Lifecycle
//!
//! ```text
//! create -> (lockup) -> activate -> mark_claimed
//! ```
//!
//! Activation is allowed from `now >= activation_time`, exactly once.

use crate::core::error::PoolError;
use crate::core::math::{self, Amount, MathError};
use crate::core::time::Timestamp;
use crate::models::event::EventId;
use crate::models::policy::{Policy, PolicyId};
use crate::policy::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyBook {
    policies: BTreeMap<PolicyId, Policy>,
    /// `(event_id, holder, policy_id)`
    by_event: BTreeSet<(EventId, String, PolicyId)>,
    next_id: PolicyId,
}

impl Default for PolicyBook {
    fn default() -> Self {
        Self {
            policies: BTreeMap::new(),
            by_event: BTreeSet::new(),
            next_id: 1,
        }
    }
}

impl PolicyBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from restored policies; ids continue after the highest one
    pub fn from_policies(policies: Vec<Policy>) -> Result<Self, MathError> {
        let mut book = Self::new();
        for policy in policies {
            let after = policy.id.checked_add(1).ok_or(MathError::Overflow)?;
            book.next_id = book.next_id.max(after);
            book.by_event
                .insert((policy.event_id, policy.holder.clone(), policy.id));
            book.policies.insert(policy.id, policy);
        }
        Ok(book)
    }

    pub fn policy(&self, id: PolicyId) -> Option<&Policy> {
        self.policies.get(&id)
    }

    pub fn get(&self, id: PolicyId) -> Result<&Policy, PolicyError> {
        self.policies.get(&id).ok_or(PolicyError::UnknownPolicy(id))
    }

    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policy ids on `event_id`, ordered by holder then id
    pub fn policies_for_event(&self, event_id: EventId) -> Vec<PolicyId> {
        self.by_event
            .range((event_id, String::new(), 0)..)
            .take_while(|(e, _, _)| *e == event_id)
            .map(|(_, _, id)| *id)
            .collect()
    }

    pub fn policies_for_holder(&self, event_id: EventId, holder: &str) -> Vec<PolicyId> {
        self.by_event
            .range((event_id, holder.to_string(), 0)..)
            .take_while(|(e, h, _)| *e == event_id && h == holder)
            .map(|(_, _, id)| *id)
            .collect()
    }

    /// Every policy held by `holder`, across events
    pub fn policies_of(&self, holder: &str) -> impl Iterator<Item = &Policy> {
        let holder = holder.to_string();
        self.policies.values().filter(move |p| p.holder == holder)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &mut self,
        holder: &str,
        event_id: EventId,
        coverage: Amount,
        annualized_premium: Amount,
        max_loss_limit: Amount,
        now: Timestamp,
        lockup_period: u64,
    ) -> Result<PolicyId, PoolError> {
        if coverage == 0 {
            return Err(PolicyError::ZeroCoverage.into());
        }
        let activation_time = now
            .checked_add(lockup_period)
            .ok_or(MathError::Overflow)?;

        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(MathError::Overflow)?;
        self.by_event.insert((event_id, holder.to_string(), id));
        self.policies.insert(
            id,
            Policy::new(
                id,
                holder.to_string(),
                event_id,
                coverage,
                annualized_premium,
                max_loss_limit,
                now,
                activation_time,
            ),
        );
        Ok(id)
    }

    pub fn activate(&mut self, caller: &str, id: PolicyId, now: Timestamp) -> Result<(), PolicyError> {
        let policy = self.get_mut(id)?;
        if policy.holder != caller {
            return Err(PolicyError::NotPolicyHolder {
                policy_id: id,
                caller: caller.to_string(),
            });
        }
        if policy.is_claimed {
            return Err(PolicyError::AlreadyClaimed(id));
        }
        if policy.is_active {
            return Err(PolicyError::AlreadyActive(id));
        }
        if now < policy.activation_time {
            return Err(PolicyError::LockupNotExpired {
                activation_time: policy.activation_time,
                now,
            });
        }
        policy.is_active = true;
        policy.last_premium_collection = Some(now);
        Ok(())
    }

    /// Book a collected premium and move the accrual checkpoint to `now`
    pub fn record_collection(&mut self, id: PolicyId, amount: Amount, now: Timestamp) -> Result<(), PoolError> {
        let policy = self.get_mut(id)?;
        let pending = math::add(policy.pending_premiums, amount)?;
        let paid = math::add(policy.premiums_paid, amount)?;
        policy.pending_premiums = pending;
        policy.premiums_paid = paid;
        policy.last_premium_collection = Some(now);
        Ok(())
    }

    /// Release the policy's escrowed premiums, returning the amount
    pub fn take_pending(&mut self, id: PolicyId) -> Result<Amount, PolicyError> {
        Ok(std::mem::take(&mut self.get_mut(id)?.pending_premiums))
    }

    pub fn mark_claimed(&mut self, id: PolicyId) -> Result<(), PolicyError> {
        let policy = self.get_mut(id)?;
        if policy.is_claimed {
            return Err(PolicyError::AlreadyClaimed(id));
        }
        policy.is_claimed = true;
        Ok(())
    }

    fn get_mut(&mut self, id: PolicyId) -> Result<&mut Policy, PolicyError> {
        self.policies.get_mut(&id).ok_or(PolicyError::UnknownPolicy(id))
    }
}
