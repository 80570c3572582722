//! Property Tests - Ledger-wide Invariants
//!
//! Critical invariants tested:
//! - Conservation holds after every operation, successful or not
//! - Distributions account for every collected unit
//! - Premium accrual is additive over time
//! - Quotes strictly increase with coverage
//! - Claim payouts equal the collateral consumed

use proptest::prelude::*;
use riskpool_core_rs::core::time::DEFAULT_LOCKUP_PERIOD;
use riskpool_core_rs::{InMemoryAsset, PoolConfig, PoolEngine};

const UNIT: u128 = 1_000_000;
const AGENTS: [&str; 3] = ["ALICE", "BOB", "CAROL"];

// ============================================================================
// Test Helpers
// ============================================================================

#[derive(Debug)]
struct Scenario {
    insurer_capital: [u128; 2],
    reinsurer_capital: u128,
    coverage: u128,
    protocol_fee_bps: u64,
}

/// Event 1 backed by two insurers and an optional reinsurer, with one
/// in-force policy activated at the returned timestamp
fn build(scenario: &Scenario) -> (PoolEngine<InMemoryAsset>, u64) {
    let config = PoolConfig {
        protocol_fee_bps: scenario.protocol_fee_bps,
        registrars: vec!["ORACLE".to_string()],
        ..PoolConfig::default()
    };
    let mut asset = InMemoryAsset::new();
    asset.mint("INSURER_A", scenario.insurer_capital[0]);
    asset.mint("INSURER_B", scenario.insurer_capital[1]);
    asset.mint("REINSURER", scenario.reinsurer_capital);
    asset.mint("HOLDER", 10_000 * UNIT);

    let mut engine = PoolEngine::new(config, asset).unwrap();
    let event = engine
        .register_event("ORACLE", "BTC -20%", "", 2_000, 500, 0)
        .unwrap();
    for (id, capital) in [
        ("INSURER_A", scenario.insurer_capital[0]),
        ("INSURER_B", scenario.insurer_capital[1]),
    ] {
        engine.deposit(id, capital, 0).unwrap();
        engine.register_insurer(id, capital, 0).unwrap();
        engine.allocate_to_event(id, event, capital, 0).unwrap();
    }
    if scenario.reinsurer_capital > 0 {
        engine
            .deposit("REINSURER", scenario.reinsurer_capital, 0)
            .unwrap();
        engine
            .register_reinsurer("REINSURER", scenario.reinsurer_capital, 0)
            .unwrap();
    }
    engine.deposit("HOLDER", 10_000 * UNIT, 0).unwrap();

    let policy_id = engine
        .buy_policy("HOLDER", event, scenario.coverage, 0, 1)
        .unwrap();
    let activated = 1 + DEFAULT_LOCKUP_PERIOD;
    engine.activate_policy("HOLDER", policy_id, activated).unwrap();
    (engine, activated)
}

fn scenario_strategy() -> impl Strategy<Value = Scenario> {
    (
        2_500u128..20_000,
        2_500u128..20_000,
        prop_oneof![Just(0u128), 1_000u128..20_000],
        1_000u128..5_000,
        0u64..1_000,
    )
        .prop_map(|(a, b, r, coverage, fee)| Scenario {
            insurer_capital: [a * UNIT, b * UNIT],
            reinsurer_capital: r * UNIT,
            coverage: coverage * UNIT,
            protocol_fee_bps: fee,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn ledger_conserved_under_random_flows(
        ops in proptest::collection::vec((0usize..3, any::<bool>(), 0u128..3_000), 1..60),
    ) {
        let mut asset = InMemoryAsset::new();
        for id in AGENTS {
            asset.mint(id, 10_000);
        }
        let mut engine = PoolEngine::new(PoolConfig::default(), asset).unwrap();

        for (step, (agent, is_deposit, amount)) in ops.into_iter().enumerate() {
            let now = step as u64;
            let id = AGENTS[agent];
            let before = engine.state().clone();
            let outcome = if is_deposit {
                engine.deposit(id, amount, now)
            } else {
                engine.withdraw(id, amount, now)
            };
            if outcome.is_err() {
                prop_assert_eq!(engine.state(), &before);
            }

            let report = engine.reconcile();
            prop_assert!(report.consistent, "{:?}", report.issue);
            prop_assert_eq!(
                report.total_system_liquidity,
                report.total_deposited - report.total_withdrawn
            );
        }

        let wallets: u128 = AGENTS.iter().map(|id| engine.asset().wallet(id)).sum();
        prop_assert_eq!(wallets + engine.total_system_liquidity(), 30_000);
    }

    #[test]
    fn distribution_accounts_for_every_unit(
        scenario in scenario_strategy(),
        days in 1u64..60,
        periodic in any::<bool>(),
    ) {
        let (mut engine, activated) = build(&scenario);
        let now = activated + days * 86_400;
        let liquidity = engine.total_system_liquidity();

        let result = if periodic {
            engine
                .distribute_periodically("KEEPER", 1, 86_400, now)
                .unwrap()
        } else {
            engine.collect_ongoing_premiums(1, now).unwrap();
            engine.distribute_event_premiums(1, now).unwrap()
        };

        prop_assert!(result.distributed > 0);
        prop_assert_eq!(
            result.insurer_share + result.reinsurer_share + result.protocol_fee + result.caller_reward,
            result.distributed
        );
        if scenario.reinsurer_capital == 0 {
            prop_assert_eq!(result.reinsurer_share, 0);
        }
        prop_assert_eq!(engine.total_system_liquidity(), liquidity);
        prop_assert_eq!(engine.protocol_fees(), result.protocol_fee);
        prop_assert!(engine.reconcile().consistent);
        prop_assert!(engine.state().check_invariants().is_ok());
    }

    #[test]
    fn accrual_is_additive(
        scenario in scenario_strategy(),
        first in 1u64..1_000_000,
        second in 1u64..1_000_000,
    ) {
        let (mut split, activated) = build(&scenario);
        let (mut single, _) = build(&scenario);

        let a = split.collect_ongoing_premiums(1, activated + first).unwrap();
        let b = split
            .collect_ongoing_premiums(1, activated + first + second)
            .unwrap();
        let whole = single
            .collect_ongoing_premiums(1, activated + first + second)
            .unwrap();

        prop_assert_eq!(a.collected + b.collected, whole.collected);
        prop_assert_eq!(
            split.event(1).unwrap().accumulated_premiums,
            single.event(1).unwrap().accumulated_premiums
        );
    }

    #[test]
    fn premium_monotone_in_coverage(
        scenario in scenario_strategy(),
        smaller in 1u128..10_000,
        extra in 1u128..10_000,
    ) {
        let (engine, _) = build(&scenario);
        let low = engine.quote_premium(1, smaller * UNIT).unwrap();
        let high = engine.quote_premium(1, (smaller + extra) * UNIT).unwrap();
        prop_assert!(low.annualized_premium < high.annualized_premium);
    }

    #[test]
    fn claim_payouts_match_consumed_collateral(scenario in scenario_strategy()) {
        let (mut engine, activated) = build(&scenario);
        let collateral_before = engine.reinsurance_state().total_capital;
        let holder_before = engine.available_balance("HOLDER");

        engine.trigger_event("ORACLE", 1, activated).unwrap();
        let result = engine.settle_claims(1, activated).unwrap();

        prop_assert_eq!(result.total_payouts, scenario.coverage);
        prop_assert_eq!(
            result.insurer_consumed + result.reinsurer_consumed,
            result.total_payouts
        );
        prop_assert_eq!(
            engine.reinsurance_state().total_capital,
            collateral_before - result.total_payouts
        );
        prop_assert_eq!(
            engine.available_balance("HOLDER"),
            holder_before + scenario.coverage
        );
        prop_assert!(engine.reconcile().consistent);
        prop_assert!(engine.state().check_invariants().is_ok());
    }
}
