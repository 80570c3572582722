//! PyO3 wrapper for PoolEngine
//!
//! Python drives an in-process pool backed by [`InMemoryAsset`]; external
//! wallets are funded with `mint`.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{
    collection_to_py, distribution_to_py, event_to_py, parse_pool_config, policy_to_py,
    pool_error_to_py, reconciliation_to_py, settlement_to_py,
};
use crate::core::math::{Amount, Bps};
use crate::core::time::Timestamp;
use crate::ledger::InMemoryAsset;
use crate::models::event::{EventId, RiskParameters};
use crate::models::policy::PolicyId;
use crate::orchestrator::PoolEngine;

/// Python wrapper for the Rust pool engine
///
/// # Example (from Python)
///
/// ```python
/// from riskpool_core_rs import PoolEngine
///
/// pool = PoolEngine({"min_collateral": 1_000, "registrars": ["ORACLE"]})
/// pool.mint("INSURER", 10_000)
/// pool.deposit("INSURER", 10_000, 0)
/// pool.register_insurer("INSURER", 10_000, 0)
/// event = pool.register_event("ORACLE", "BTC -20%", "", 2_000, 500, 0)
/// pool.allocate_to_event("INSURER", event, 10_000, 0)
/// ```
#[pyclass(name = "PoolEngine")]
pub struct PyPoolEngine {
    inner: PoolEngine<InMemoryAsset>,
}

#[pymethods]
impl PyPoolEngine {
    /// Create a pool from an optional config dict (missing keys use defaults)
    ///
    /// # Errors
    ///
    /// Raises ValueError if a value has the wrong type or the config is invalid.
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let rust_config = match config {
            Some(dict) => parse_pool_config(dict)?,
            None => Default::default(),
        };
        let inner = PoolEngine::new(rust_config, InMemoryAsset::new()).map_err(pool_error_to_py)?;
        Ok(PyPoolEngine { inner })
    }

    /// Rebuild a pool from `save_state` output
    #[staticmethod]
    #[pyo3(signature = (state_json, config=None))]
    fn load_state(state_json: &str, config: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let rust_config = match config {
            Some(dict) => parse_pool_config(dict)?,
            None => Default::default(),
        };
        let inner = PoolEngine::load_state(rust_config, state_json, InMemoryAsset::new())
            .map_err(pool_error_to_py)?;
        Ok(PyPoolEngine { inner })
    }

    fn save_state(&self) -> PyResult<String> {
        self.inner.save_state().map_err(pool_error_to_py)
    }

    // ========================================================================
    // External wallets
    // ========================================================================

    /// Fund an external wallet
    fn mint(&mut self, account: &str, amount: Amount) {
        self.inner.asset_mut().mint(account, amount);
    }

    fn wallet(&self, account: &str) -> Amount {
        self.inner.asset().wallet(account)
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    fn deposit(&mut self, participant: &str, amount: Amount, now: Timestamp) -> PyResult<Amount> {
        self.inner.deposit(participant, amount, now).map_err(pool_error_to_py)
    }

    fn withdraw(&mut self, participant: &str, amount: Amount, now: Timestamp) -> PyResult<Amount> {
        self.inner.withdraw(participant, amount, now).map_err(pool_error_to_py)
    }

    fn withdraw_protocol_fees(&mut self, caller: &str, recipient: &str, amount: Amount, now: Timestamp) -> PyResult<()> {
        self.inner
            .withdraw_protocol_fees(caller, recipient, amount, now)
            .map_err(pool_error_to_py)
    }

    fn available_balance(&self, participant: &str) -> Amount {
        self.inner.available_balance(participant)
    }

    fn protocol_fees(&self) -> Amount {
        self.inner.protocol_fees()
    }

    fn total_system_liquidity(&self) -> Amount {
        self.inner.total_system_liquidity()
    }

    fn reconcile<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        reconciliation_to_py(py, &self.inner.reconcile())
    }

    // ========================================================================
    // Capital
    // ========================================================================

    fn register_insurer(&mut self, participant: &str, collateral: Amount, now: Timestamp) -> PyResult<()> {
        self.inner
            .register_insurer(participant, collateral, now)
            .map_err(pool_error_to_py)
    }

    fn register_reinsurer(&mut self, participant: &str, collateral: Amount, now: Timestamp) -> PyResult<()> {
        self.inner
            .register_reinsurer(participant, collateral, now)
            .map_err(pool_error_to_py)
    }

    fn add_insurer_capital(&mut self, participant: &str, amount: Amount, now: Timestamp) -> PyResult<Amount> {
        self.inner
            .add_insurer_capital(participant, amount, now)
            .map_err(pool_error_to_py)
    }

    fn add_reinsurer_capital(&mut self, participant: &str, amount: Amount, now: Timestamp) -> PyResult<Amount> {
        self.inner
            .add_reinsurer_capital(participant, amount, now)
            .map_err(pool_error_to_py)
    }

    fn allocate_to_event(&mut self, insurer: &str, event_id: EventId, amount: Amount, now: Timestamp) -> PyResult<Amount> {
        self.inner
            .allocate_to_event(insurer, event_id, amount, now)
            .map_err(pool_error_to_py)
    }

    fn remove_from_event(&mut self, insurer: &str, event_id: EventId, amount: Amount, now: Timestamp) -> PyResult<Amount> {
        self.inner
            .remove_from_event(insurer, event_id, amount, now)
            .map_err(pool_error_to_py)
    }

    fn allocation(&self, insurer: &str, event_id: EventId) -> Amount {
        self.inner.allocation(insurer, event_id)
    }

    // ========================================================================
    // Events
    // ========================================================================

    fn register_event(
        &mut self,
        caller: &str,
        name: &str,
        description: &str,
        trigger_threshold_bps: Bps,
        base_premium_bps: Bps,
        now: Timestamp,
    ) -> PyResult<EventId> {
        self.inner
            .register_event(caller, name, description, trigger_threshold_bps, base_premium_bps, now)
            .map_err(pool_error_to_py)
    }

    fn trigger_event(&mut self, caller: &str, event_id: EventId, now: Timestamp) -> PyResult<()> {
        self.inner
            .trigger_event(caller, event_id, now)
            .map_err(pool_error_to_py)
    }

    fn set_risk_parameters(
        &mut self,
        caller: &str,
        event_id: EventId,
        expected_loss_ratio_bps: Bps,
        total_loss_ratio_bps: Bps,
        max_premium_bps: Bps,
        now: Timestamp,
    ) -> PyResult<()> {
        let risk = RiskParameters {
            expected_loss_ratio_bps,
            total_loss_ratio_bps,
            max_premium_bps,
        };
        self.inner
            .set_risk_parameters(caller, event_id, risk, now)
            .map_err(pool_error_to_py)
    }

    /// Event as a dict, or None if unknown
    fn get_event<'py>(&self, py: Python<'py>, event_id: EventId) -> PyResult<Option<Bound<'py, PyDict>>> {
        self.inner
            .event(event_id)
            .map(|event| event_to_py(py, event))
            .transpose()
    }

    // ========================================================================
    // Policies and distribution
    // ========================================================================

    fn quote_premium(&self, event_id: EventId, coverage: Amount) -> PyResult<Amount> {
        self.inner
            .quote_premium(event_id, coverage)
            .map(|quote| quote.annualized_premium)
            .map_err(pool_error_to_py)
    }

    fn buy_policy(
        &mut self,
        holder: &str,
        event_id: EventId,
        coverage: Amount,
        max_loss_limit: Amount,
        now: Timestamp,
    ) -> PyResult<PolicyId> {
        self.inner
            .buy_policy(holder, event_id, coverage, max_loss_limit, now)
            .map_err(pool_error_to_py)
    }

    fn activate_policy(&mut self, holder: &str, policy_id: PolicyId, now: Timestamp) -> PyResult<()> {
        self.inner
            .activate_policy(holder, policy_id, now)
            .map_err(pool_error_to_py)
    }

    fn get_policy<'py>(&self, py: Python<'py>, policy_id: PolicyId) -> PyResult<Option<Bound<'py, PyDict>>> {
        self.inner
            .policy(policy_id)
            .map(|policy| policy_to_py(py, policy))
            .transpose()
    }

    fn collect_ongoing_premiums<'py>(&mut self, py: Python<'py>, event_id: EventId, now: Timestamp) -> PyResult<Bound<'py, PyDict>> {
        let result = self
            .inner
            .collect_ongoing_premiums(event_id, now)
            .map_err(pool_error_to_py)?;
        collection_to_py(py, &result)
    }

    fn distribute_event_premiums<'py>(&mut self, py: Python<'py>, event_id: EventId, now: Timestamp) -> PyResult<Bound<'py, PyDict>> {
        let result = self
            .inner
            .distribute_event_premiums(event_id, now)
            .map_err(pool_error_to_py)?;
        distribution_to_py(py, &result)
    }

    fn distribute_periodically<'py>(
        &mut self,
        py: Python<'py>,
        caller: &str,
        event_id: EventId,
        interval: u64,
        now: Timestamp,
    ) -> PyResult<Bound<'py, PyDict>> {
        let result = self
            .inner
            .distribute_periodically(caller, event_id, interval, now)
            .map_err(pool_error_to_py)?;
        distribution_to_py(py, &result)
    }

    fn settle_claims<'py>(&mut self, py: Python<'py>, event_id: EventId, now: Timestamp) -> PyResult<Bound<'py, PyDict>> {
        let result = self
            .inner
            .settle_claims(event_id, now)
            .map_err(pool_error_to_py)?;
        settlement_to_py(py, &result)
    }
}
