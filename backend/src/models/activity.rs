//! Activity logging for auditing and replay.
//!
//! Every committed state change appends one [`Activity`] to the engine's
//! [`ActivityLog`]. Failed operations append nothing. Activities enable:
//! - Auditing (who moved which amount, when)
//! - Debugging (what happened to an event or a policy)
//! - Reconciliation against the payment asset
//!
//! # Example
//!
//! ```rust
//! use riskpool_core_rs::models::{Activity, ActivityLog};
//!
//! let mut log = ActivityLog::new();
//! log.log(Activity::Deposit {
//!     time: 10,
//!     participant: "ALICE".to_string(),
//!     amount: 100,
//! });
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.activities_for_participant("ALICE").len(), 1);
//! assert_eq!(log.activities()[0].activity_type(), "Deposit");
//! ```

use crate::core::math::Amount;
use crate::core::time::Timestamp;
use crate::models::event::EventId;
use crate::models::policy::PolicyId;
use serde::{Deserialize, Serialize};

/// Capital provider role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapitalRole {
    Insurer,
    Reinsurer,
}

/// Committed state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    Deposit {
        time: Timestamp,
        participant: String,
        amount: Amount,
    },

    Withdraw {
        time: Timestamp,
        participant: String,
        amount: Amount,
    },

    CapitalRegistered {
        time: Timestamp,
        participant: String,
        role: CapitalRole,
        collateral: Amount,
    },

    CapitalAdded {
        time: Timestamp,
        participant: String,
        role: CapitalRole,
        amount: Amount,
        new_total: Amount,
    },

    Allocated {
        time: Timestamp,
        participant: String,
        event_id: EventId,
        amount: Amount,
        event_capital: Amount,
    },

    Deallocated {
        time: Timestamp,
        participant: String,
        event_id: EventId,
        amount: Amount,
        event_capital: Amount,
    },

    EventRegistered {
        time: Timestamp,
        event_id: EventId,
        name: String,
    },

    RiskParametersUpdated {
        time: Timestamp,
        event_id: EventId,
    },

    EventTriggered {
        time: Timestamp,
        event_id: EventId,
    },

    PolicyPurchased {
        time: Timestamp,
        policy_id: PolicyId,
        holder: String,
        event_id: EventId,
        coverage: Amount,
        annualized_premium: Amount,
    },

    PolicyActivated {
        time: Timestamp,
        policy_id: PolicyId,
        holder: String,
    },

    PremiumsCollected {
        time: Timestamp,
        event_id: EventId,
        amount: Amount,
        policies_charged: usize,
        policies_skipped: usize,
    },

    PremiumsDistributed {
        time: Timestamp,
        event_id: EventId,
        insurer_share: Amount,
        reinsurer_share: Amount,
        protocol_fee: Amount,
        caller_reward: Amount,
        caller: Option<String>,
    },

    ClaimsSettled {
        time: Timestamp,
        event_id: EventId,
        policies_paid: usize,
        total_payouts: Amount,
        insurer_consumed: Amount,
        reinsurer_consumed: Amount,
    },

    ProtocolFeesWithdrawn {
        time: Timestamp,
        recipient: String,
        amount: Amount,
    },
}

impl Activity {
    /// Timestamp supplied by the operation that produced this activity
    pub fn time(&self) -> Timestamp {
        match self {
            Activity::Deposit { time, .. }
            | Activity::Withdraw { time, .. }
            | Activity::CapitalRegistered { time, .. }
            | Activity::CapitalAdded { time, .. }
            | Activity::Allocated { time, .. }
            | Activity::Deallocated { time, .. }
            | Activity::EventRegistered { time, .. }
            | Activity::RiskParametersUpdated { time, .. }
            | Activity::EventTriggered { time, .. }
            | Activity::PolicyPurchased { time, .. }
            | Activity::PolicyActivated { time, .. }
            | Activity::PremiumsCollected { time, .. }
            | Activity::PremiumsDistributed { time, .. }
            | Activity::ClaimsSettled { time, .. }
            | Activity::ProtocolFeesWithdrawn { time, .. } => *time,
        }
    }

    /// Short description of the activity type
    pub fn activity_type(&self) -> &'static str {
        match self {
            Activity::Deposit { .. } => "Deposit",
            Activity::Withdraw { .. } => "Withdraw",
            Activity::CapitalRegistered { .. } => "CapitalRegistered",
            Activity::CapitalAdded { .. } => "CapitalAdded",
            Activity::Allocated { .. } => "Allocated",
            Activity::Deallocated { .. } => "Deallocated",
            Activity::EventRegistered { .. } => "EventRegistered",
            Activity::RiskParametersUpdated { .. } => "RiskParametersUpdated",
            Activity::EventTriggered { .. } => "EventTriggered",
            Activity::PolicyPurchased { .. } => "PolicyPurchased",
            Activity::PolicyActivated { .. } => "PolicyActivated",
            Activity::PremiumsCollected { .. } => "PremiumsCollected",
            Activity::PremiumsDistributed { .. } => "PremiumsDistributed",
            Activity::ClaimsSettled { .. } => "ClaimsSettled",
            Activity::ProtocolFeesWithdrawn { .. } => "ProtocolFeesWithdrawn",
        }
    }

    /// Event ID if the activity concerns a specific event
    pub fn event_id(&self) -> Option<EventId> {
        match self {
            Activity::Allocated { event_id, .. }
            | Activity::Deallocated { event_id, .. }
            | Activity::EventRegistered { event_id, .. }
            | Activity::RiskParametersUpdated { event_id, .. }
            | Activity::EventTriggered { event_id, .. }
            | Activity::PolicyPurchased { event_id, .. }
            | Activity::PremiumsCollected { event_id, .. }
            | Activity::PremiumsDistributed { event_id, .. }
            | Activity::ClaimsSettled { event_id, .. } => Some(*event_id),
            _ => None,
        }
    }

    /// Participant ID if the activity concerns a specific participant
    pub fn participant(&self) -> Option<&str> {
        match self {
            Activity::Deposit { participant, .. }
            | Activity::Withdraw { participant, .. }
            | Activity::CapitalRegistered { participant, .. }
            | Activity::CapitalAdded { participant, .. }
            | Activity::Allocated { participant, .. }
            | Activity::Deallocated { participant, .. } => Some(participant),
            Activity::PolicyPurchased { holder, .. } | Activity::PolicyActivated { holder, .. } => {
                Some(holder)
            }
            Activity::PremiumsDistributed { caller, .. } => caller.as_deref(),
            Activity::ProtocolFeesWithdrawn { recipient, .. } => Some(recipient),
            _ => None,
        }
    }
}

/// Append-only activity log with query helpers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    activities: Vec<Activity>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            activities: Vec::new(),
        }
    }

    pub fn log(&mut self, activity: Activity) {
        self.activities.push(activity);
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn activities_of_type(&self, activity_type: &str) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.activity_type() == activity_type)
            .collect()
    }

    pub fn activities_for_event(&self, event_id: EventId) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.event_id() == Some(event_id))
            .collect()
    }

    pub fn activities_for_participant(&self, participant: &str) -> Vec<&Activity> {
        self.activities
            .iter()
            .filter(|a| a.participant() == Some(participant))
            .collect()
    }
}
