//! Scenario scripts
//!
//! A scenario funds external wallets and then replays a list of steps
//! against a [`PoolEngine`]. Steps are externally tagged JSON objects:
//!
//! ```json
//! {
//!   "wallets": { "INSURER": 10000000000 },
//!   "steps": [
//!     { "deposit": { "participant": "INSURER", "amount": 10000000000, "now": 0 } },
//!     { "register_insurer": { "participant": "INSURER", "collateral": 10000000000, "now": 0 } }
//!   ]
//! }
//! ```

use riskpool_core_rs::{InMemoryAsset, PoolEngine, PoolError, RiskParameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// External wallet balances minted before the first step
    #[serde(default)]
    pub wallets: BTreeMap<String, u128>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Deposit {
        participant: String,
        amount: u128,
        now: u64,
    },
    Withdraw {
        participant: String,
        amount: u128,
        now: u64,
    },
    WithdrawProtocolFees {
        caller: String,
        recipient: String,
        amount: u128,
        now: u64,
    },
    RegisterInsurer {
        participant: String,
        collateral: u128,
        now: u64,
    },
    RegisterReinsurer {
        participant: String,
        collateral: u128,
        now: u64,
    },
    AddInsurerCapital {
        participant: String,
        amount: u128,
        now: u64,
    },
    AddReinsurerCapital {
        participant: String,
        amount: u128,
        now: u64,
    },
    Allocate {
        insurer: String,
        event_id: u64,
        amount: u128,
        now: u64,
    },
    Deallocate {
        insurer: String,
        event_id: u64,
        amount: u128,
        now: u64,
    },
    RegisterEvent {
        caller: String,
        name: String,
        #[serde(default)]
        description: String,
        trigger_threshold_bps: u64,
        base_premium_bps: u64,
        now: u64,
    },
    SetRiskParameters {
        caller: String,
        event_id: u64,
        expected_loss_ratio_bps: u64,
        total_loss_ratio_bps: u64,
        max_premium_bps: u64,
        now: u64,
    },
    TriggerEvent {
        caller: String,
        event_id: u64,
        now: u64,
    },
    Quote {
        event_id: u64,
        coverage: u128,
    },
    BuyPolicy {
        holder: String,
        event_id: u64,
        coverage: u128,
        #[serde(default)]
        max_loss_limit: u128,
        now: u64,
    },
    ActivatePolicy {
        holder: String,
        policy_id: u64,
        now: u64,
    },
    CollectPremiums {
        event_id: u64,
        now: u64,
    },
    DistributePremiums {
        event_id: u64,
        now: u64,
    },
    DistributePeriodically {
        caller: String,
        event_id: u64,
        interval: u64,
        now: u64,
    },
    SettleClaims {
        event_id: u64,
        now: u64,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::WithdrawProtocolFees { .. } => "withdraw_protocol_fees",
            Step::RegisterInsurer { .. } => "register_insurer",
            Step::RegisterReinsurer { .. } => "register_reinsurer",
            Step::AddInsurerCapital { .. } => "add_insurer_capital",
            Step::AddReinsurerCapital { .. } => "add_reinsurer_capital",
            Step::Allocate { .. } => "allocate",
            Step::Deallocate { .. } => "deallocate",
            Step::RegisterEvent { .. } => "register_event",
            Step::SetRiskParameters { .. } => "set_risk_parameters",
            Step::TriggerEvent { .. } => "trigger_event",
            Step::Quote { .. } => "quote",
            Step::BuyPolicy { .. } => "buy_policy",
            Step::ActivatePolicy { .. } => "activate_policy",
            Step::CollectPremiums { .. } => "collect_premiums",
            Step::DistributePremiums { .. } => "distribute_premiums",
            Step::DistributePeriodically { .. } => "distribute_periodically",
            Step::SettleClaims { .. } => "settle_claims",
        }
    }

    /// Apply the step and render its result as JSON
    pub fn apply(&self, engine: &mut PoolEngine<InMemoryAsset>) -> Result<String, PoolError> {
        let rendered = match self {
            Step::Deposit {
                participant,
                amount,
                now,
            } => render(&engine.deposit(participant, *amount, *now)?),
            Step::Withdraw {
                participant,
                amount,
                now,
            } => render(&engine.withdraw(participant, *amount, *now)?),
            Step::WithdrawProtocolFees {
                caller,
                recipient,
                amount,
                now,
            } => render(&engine.withdraw_protocol_fees(caller, recipient, *amount, *now)?),
            Step::RegisterInsurer {
                participant,
                collateral,
                now,
            } => render(&engine.register_insurer(participant, *collateral, *now)?),
            Step::RegisterReinsurer {
                participant,
                collateral,
                now,
            } => render(&engine.register_reinsurer(participant, *collateral, *now)?),
            Step::AddInsurerCapital {
                participant,
                amount,
                now,
            } => render(&engine.add_insurer_capital(participant, *amount, *now)?),
            Step::AddReinsurerCapital {
                participant,
                amount,
                now,
            } => render(&engine.add_reinsurer_capital(participant, *amount, *now)?),
            Step::Allocate {
                insurer,
                event_id,
                amount,
                now,
            } => render(&engine.allocate_to_event(insurer, *event_id, *amount, *now)?),
            Step::Deallocate {
                insurer,
                event_id,
                amount,
                now,
            } => render(&engine.remove_from_event(insurer, *event_id, *amount, *now)?),
            Step::RegisterEvent {
                caller,
                name,
                description,
                trigger_threshold_bps,
                base_premium_bps,
                now,
            } => render(&engine.register_event(
                caller,
                name,
                description,
                *trigger_threshold_bps,
                *base_premium_bps,
                *now,
            )?),
            Step::SetRiskParameters {
                caller,
                event_id,
                expected_loss_ratio_bps,
                total_loss_ratio_bps,
                max_premium_bps,
                now,
            } => {
                let risk = RiskParameters {
                    expected_loss_ratio_bps: *expected_loss_ratio_bps,
                    total_loss_ratio_bps: *total_loss_ratio_bps,
                    max_premium_bps: *max_premium_bps,
                };
                render(&engine.set_risk_parameters(caller, *event_id, risk, *now)?)
            }
            Step::TriggerEvent {
                caller,
                event_id,
                now,
            } => render(&engine.trigger_event(caller, *event_id, *now)?),
            Step::Quote { event_id, coverage } => {
                render(&engine.quote_premium(*event_id, *coverage)?)
            }
            Step::BuyPolicy {
                holder,
                event_id,
                coverage,
                max_loss_limit,
                now,
            } => render(&engine.buy_policy(holder, *event_id, *coverage, *max_loss_limit, *now)?),
            Step::ActivatePolicy {
                holder,
                policy_id,
                now,
            } => render(&engine.activate_policy(holder, *policy_id, *now)?),
            Step::CollectPremiums { event_id, now } => {
                render(&engine.collect_ongoing_premiums(*event_id, *now)?)
            }
            Step::DistributePremiums { event_id, now } => {
                render(&engine.distribute_event_premiums(*event_id, *now)?)
            }
            Step::DistributePeriodically {
                caller,
                event_id,
                interval,
                now,
            } => render(&engine.distribute_periodically(caller, *event_id, *interval, *now)?),
            Step::SettleClaims { event_id, now } => {
                render(&engine.settle_claims(*event_id, *now)?)
            }
        };
        Ok(rendered)
    }
}

fn render<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("\"<unrenderable: {}>\"", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskpool_core_rs::PoolConfig;

    const SCRIPT: &str = r#"{
        "wallets": { "INSURER": 10000, "HOLDER": 2000 },
        "steps": [
            { "deposit": { "participant": "INSURER", "amount": 10000, "now": 0 } },
            { "deposit": { "participant": "HOLDER", "amount": 2000, "now": 0 } },
            { "register_insurer": { "participant": "INSURER", "collateral": 10000, "now": 0 } },
            { "register_event": { "caller": "ORACLE", "name": "BTC -20%",
                "trigger_threshold_bps": 2000, "base_premium_bps": 500, "now": 0 } },
            { "allocate": { "insurer": "INSURER", "event_id": 1, "amount": 10000, "now": 0 } },
            { "buy_policy": { "holder": "HOLDER", "event_id": 1, "coverage": 5000, "now": 10 } },
            { "activate_policy": { "holder": "HOLDER", "policy_id": 1, "now": 604810 } },
            { "trigger_event": { "caller": "ORACLE", "event_id": 1, "now": 604900 } },
            { "settle_claims": { "event_id": 1, "now": 604900 } }
        ]
    }"#;

    fn run(scenario: &Scenario) -> Result<PoolEngine<InMemoryAsset>, PoolError> {
        let config = PoolConfig {
            min_collateral: 1_000,
            registrars: vec!["ORACLE".to_string()],
            ..PoolConfig::default()
        };
        let mut asset = InMemoryAsset::new();
        for (id, amount) in &scenario.wallets {
            asset.mint(id, *amount);
        }
        let mut engine = PoolEngine::new(config, asset)?;
        for step in &scenario.steps {
            step.apply(&mut engine)?;
        }
        Ok(engine)
    }

    #[test]
    fn test_scenario_parses() {
        let scenario: Scenario = serde_json::from_str(SCRIPT).unwrap();
        assert_eq!(scenario.steps.len(), 9);
        assert_eq!(scenario.steps[5].name(), "buy_policy");
        assert_eq!(scenario.wallets["HOLDER"], 2_000);
    }

    #[test]
    fn test_claim_scenario_pays_holder() {
        let scenario: Scenario = serde_json::from_str(SCRIPT).unwrap();
        let engine = run(&scenario).unwrap();
        assert_eq!(engine.available_balance("HOLDER"), 7_000);
        assert_eq!(engine.insurer("INSURER").unwrap().total_collateral(), 5_000);
        assert!(engine.reconcile().consistent);
    }

    #[test]
    fn test_step_renders_result() {
        let mut engine = PoolEngine::new(PoolConfig::default(), InMemoryAsset::new()).unwrap();
        engine.asset_mut().mint("ALICE", 100);
        let step = Step::Deposit {
            participant: "ALICE".to_string(),
            amount: 60,
            now: 1,
        };
        assert_eq!(step.apply(&mut engine).unwrap(), "60");
    }
}
