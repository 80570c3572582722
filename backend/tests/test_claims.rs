//! Claim Settlement Tests
//!
//! Critical invariants tested:
//! - Every in-force policy of a triggered event is paid its full coverage
//! - Payouts are consumed from insurer and reinsurer collateral exactly
//! - A policy is paid at most once
//! - Under-collateralized settlement fails atomically as a fatal error

use riskpool_core_rs::core::time::DEFAULT_LOCKUP_PERIOD;
use riskpool_core_rs::{
    DistributionError, ErrorKind, EventError, InMemoryAsset, LockKind, PoolConfig, PoolEngine,
    PoolError,
};

const UNIT: u128 = 1_000_000;
const BUY_TIME: u64 = 1_000;
const ACTIVATED: u64 = BUY_TIME + DEFAULT_LOCKUP_PERIOD;
const TRIGGERED: u64 = ACTIVATED + 3_600;

// ============================================================================
// Test Helpers
// ============================================================================

struct Setup {
    insurers: Vec<(&'static str, u128)>,
    reinsurer: Option<u128>,
}

fn create_engine(setup: Setup) -> (PoolEngine<InMemoryAsset>, u64) {
    let config = PoolConfig {
        registrars: vec!["ORACLE".to_string()],
        ..PoolConfig::default()
    };
    let mut engine = PoolEngine::new(config, InMemoryAsset::new()).unwrap();
    let event = engine
        .register_event("ORACLE", "BTC -20%", "30-day drawdown", 2_000, 500, 0)
        .unwrap();

    for (id, allocation) in &setup.insurers {
        engine.asset_mut().mint(id, 10_000 * UNIT);
        engine.deposit(id, 10_000 * UNIT, 0).unwrap();
        engine.register_insurer(id, 10_000 * UNIT, 0).unwrap();
        engine.allocate_to_event(id, event, *allocation, 0).unwrap();
    }
    if let Some(collateral) = setup.reinsurer {
        engine.asset_mut().mint("REINSURER", collateral);
        engine.deposit("REINSURER", collateral, 0).unwrap();
        engine.register_reinsurer("REINSURER", collateral, 0).unwrap();
    }
    engine.asset_mut().mint("HOLDER", 2_000 * UNIT);
    engine.deposit("HOLDER", 2_000 * UNIT, 0).unwrap();
    (engine, event)
}

fn insure(engine: &mut PoolEngine<InMemoryAsset>, holder: &str, event: u64, coverage: u128) -> u64 {
    let policy_id = engine
        .buy_policy(holder, event, coverage, 0, BUY_TIME)
        .unwrap();
    engine.activate_policy(holder, policy_id, ACTIVATED).unwrap();
    policy_id
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_single_insurer_pays_full_coverage() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: None,
    });
    let policy_id = engine
        .buy_policy("HOLDER", event, 5_000 * UNIT, 1_000 * UNIT, BUY_TIME)
        .unwrap();
    engine.activate_policy("HOLDER", policy_id, ACTIVATED).unwrap();
    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();

    let holder_before = engine.available_balance("HOLDER");
    let result = engine.settle_claims(event, TRIGGERED).unwrap();

    assert_eq!(result.policies_paid, 1);
    assert_eq!(result.total_payouts, 5_000 * UNIT);
    assert_eq!(result.insurer_consumed, 5_000 * UNIT);
    assert_eq!(result.reinsurer_consumed, 0);
    assert_eq!(engine.available_balance("HOLDER"), holder_before + 5_000 * UNIT);

    let insurer = engine.insurer("INSURER").unwrap();
    assert_eq!(insurer.total_collateral(), 5_000 * UNIT);
    assert_eq!(insurer.allocation(event), 5_000 * UNIT);
    assert_eq!(
        engine
            .participant("INSURER")
            .unwrap()
            .locked(LockKind::Insurer),
        5_000 * UNIT
    );

    let e = engine.event(event).unwrap();
    assert_eq!(e.total_insurer_capital, 5_000 * UNIT);
    assert_eq!(e.total_payouts, 5_000 * UNIT);
    assert!(engine.policy(policy_id).unwrap().is_claimed);
    assert!(engine.reconcile().consistent);
}

#[test]
fn test_second_settlement_pays_nothing() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: None,
    });
    insure(&mut engine, "HOLDER", event, 5_000 * UNIT);
    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();
    engine.settle_claims(event, TRIGGERED).unwrap();
    let balance = engine.available_balance("HOLDER");

    let again = engine.settle_claims(event, TRIGGERED + 1).unwrap();
    assert_eq!(again.policies_paid, 0);
    assert_eq!(again.total_payouts, 0);
    assert_eq!(engine.available_balance("HOLDER"), balance);
    assert_eq!(engine.event(event).unwrap().total_payouts, 5_000 * UNIT);
}

#[test]
fn test_inactive_policy_not_paid() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: None,
    });
    let policy_id = engine
        .buy_policy("HOLDER", event, 5_000 * UNIT, 0, BUY_TIME)
        .unwrap();
    engine.trigger_event("ORACLE", event, BUY_TIME + 10).unwrap();

    let result = engine.settle_claims(event, BUY_TIME + 10).unwrap();
    assert_eq!(result.policies_paid, 0);
    assert!(!engine.policy(policy_id).unwrap().is_claimed);
    assert_eq!(engine.insurer("INSURER").unwrap().total_collateral(), 10_000 * UNIT);
}

// ============================================================================
// Capital consumption
// ============================================================================

#[test]
fn test_insurers_consumed_pro_rata_to_allocation() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER_A", 6_000 * UNIT), ("INSURER_B", 4_000 * UNIT)],
        reinsurer: None,
    });
    insure(&mut engine, "HOLDER", event, 5_000 * UNIT);
    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();
    engine.settle_claims(event, TRIGGERED).unwrap();

    assert_eq!(engine.allocation("INSURER_A", event), 3_000 * UNIT);
    assert_eq!(engine.allocation("INSURER_B", event), 2_000 * UNIT);
    assert_eq!(engine.insurer("INSURER_A").unwrap().total_collateral(), 7_000 * UNIT);
    assert_eq!(engine.insurer("INSURER_B").unwrap().total_collateral(), 8_000 * UNIT);
    assert!(engine.reconcile().consistent);
}

#[test]
fn test_reinsurers_carry_their_claim_share() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: Some(10_000 * UNIT),
    });
    insure(&mut engine, "HOLDER", event, 5_000 * UNIT);
    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();

    let result = engine.settle_claims(event, TRIGGERED).unwrap();
    assert_eq!(result.insurer_consumed, 3_500 * UNIT);
    assert_eq!(result.reinsurer_consumed, 1_500 * UNIT);
    assert_eq!(engine.insurer("INSURER").unwrap().total_collateral(), 6_500 * UNIT);
    assert_eq!(engine.reinsurer("REINSURER").unwrap().deployable(), 8_500 * UNIT);
    assert_eq!(engine.reinsurance_state().reinsurance_capital, 8_500 * UNIT);
    assert!(engine.reconcile().consistent);
}

#[test]
fn test_reinsurer_shortfall_falls_back_to_insurers() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: Some(1_000 * UNIT),
    });
    insure(&mut engine, "HOLDER", event, 5_000 * UNIT);
    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();

    let result = engine.settle_claims(event, TRIGGERED).unwrap();
    assert_eq!(result.reinsurer_consumed, 1_000 * UNIT);
    assert_eq!(result.insurer_consumed, 4_000 * UNIT);
    assert_eq!(engine.reinsurer("REINSURER").unwrap().deployable(), 0);
    assert!(engine.reconcile().consistent);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_insufficient_insurer_capital_is_fatal_and_atomic() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 4_000 * UNIT)],
        reinsurer: None,
    });
    insure(&mut engine, "HOLDER", event, 5_000 * UNIT);
    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();
    let before = engine.state().clone();

    let err = engine.settle_claims(event, TRIGGERED).unwrap_err();
    assert_eq!(
        err,
        PoolError::Distribution(DistributionError::InsufficientInsurerCapital {
            event_id: event,
            allocated: 4_000 * UNIT,
            payouts: 5_000 * UNIT,
        })
    );
    assert_eq!(err.kind(), ErrorKind::FatalInvariantViolation);
    assert!(err.is_fatal());
    assert_eq!(engine.state(), &before);
}

#[test]
fn test_settle_requires_trigger() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: None,
    });
    insure(&mut engine, "HOLDER", event, 5_000 * UNIT);
    assert_eq!(
        engine.settle_claims(event, TRIGGERED),
        Err(PoolError::Event(EventError::NotTriggered(event)))
    );
}

#[test]
fn test_capital_locked_until_claims_settled() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: None,
    });
    insure(&mut engine, "HOLDER", event, 5_000 * UNIT);
    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();

    assert_eq!(
        engine.remove_from_event("INSURER", event, 10_000 * UNIT, TRIGGERED),
        Err(PoolError::Event(EventError::ClaimsOutstanding(event)))
    );

    engine.settle_claims(event, TRIGGERED).unwrap();
    assert_eq!(
        engine.remove_from_event("INSURER", event, 5_000 * UNIT, TRIGGERED),
        Ok(0)
    );
    assert_eq!(engine.insurer("INSURER").unwrap().deployable(), 5_000 * UNIT);
}

#[test]
fn test_trigger_requires_registrar_and_happens_once() {
    let (mut engine, event) = create_engine(Setup {
        insurers: vec![("INSURER", 10_000 * UNIT)],
        reinsurer: None,
    });
    let err = engine.trigger_event("HOLDER", event, TRIGGERED).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    engine.trigger_event("ORACLE", event, TRIGGERED).unwrap();
    assert_eq!(
        engine.trigger_event("ORACLE", event, TRIGGERED),
        Err(PoolError::Event(EventError::AlreadyTriggered(event)))
    );
    assert_eq!(engine.event(event).unwrap().trigger_time, Some(TRIGGERED));
}
