//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust types and PyO3-compatible types (PyDict, PyList).

use pyo3::exceptions::{PyPermissionError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::core::config::PoolConfig;
use crate::core::error::{ErrorKind, PoolError};
use crate::models::event::Event;
use crate::models::policy::Policy;
use crate::orchestrator::{CollectionResult, DistributionResult, ReconciliationReport, SettlementResult};

// ========================================================================
// PyDict Extraction Helpers
// ========================================================================

/// Extract an optional field from a Python dict.
///
/// # Errors
/// Returns error only if type conversion fails (not if field is missing)
fn extract_optional<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<Option<T>>
where
    for<'py> T: FromPyObject<'py>,
{
    match dict.get_item(key)? {
        Some(value) => Ok(Some(value.extract()?)),
        None => Ok(None),
    }
}

/// Overwrite `target` when `key` is present
fn override_field<T>(dict: &Bound<'_, PyDict>, key: &str, target: &mut T) -> PyResult<()>
where
    for<'py> T: FromPyObject<'py>,
{
    if let Some(value) = extract_optional(dict, key)? {
        *target = value;
    }
    Ok(())
}

// ========================================================================
// Configuration Parser
// ========================================================================

/// Convert Python dict to PoolConfig
///
/// Missing keys keep their defaults.
///
/// # Errors
///
/// Returns PyValueError if a value has the wrong type or the resulting
/// config does not validate.
pub fn parse_pool_config(py_config: &Bound<'_, PyDict>) -> PyResult<PoolConfig> {
    let mut config = PoolConfig::default();
    override_field(py_config, "amount_decimals", &mut config.amount_decimals)?;
    override_field(py_config, "min_collateral", &mut config.min_collateral)?;
    override_field(py_config, "lockup_period_secs", &mut config.lockup_period_secs)?;
    override_field(
        py_config,
        "min_distribution_interval_secs",
        &mut config.min_distribution_interval_secs,
    )?;
    override_field(py_config, "gratification_bps", &mut config.gratification_bps)?;
    override_field(py_config, "protocol_fee_bps", &mut config.protocol_fee_bps)?;
    override_field(py_config, "insurer_claim_share_bps", &mut config.insurer_claim_share_bps)?;
    override_field(py_config, "risk_loading_bps", &mut config.risk_loading_bps)?;
    override_field(
        py_config,
        "default_expected_loss_ratio_bps",
        &mut config.default_expected_loss_ratio_bps,
    )?;
    override_field(
        py_config,
        "default_total_loss_ratio_bps",
        &mut config.default_total_loss_ratio_bps,
    )?;
    override_field(py_config, "max_premium_multiplier", &mut config.max_premium_multiplier)?;
    override_field(
        py_config,
        "policy_reserve_window_secs",
        &mut config.policy_reserve_window_secs,
    )?;
    override_field(py_config, "registrars", &mut config.registrars)?;

    config
        .validate()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    Ok(config)
}

/// Map a pool error to the matching Python exception class
pub fn pool_error_to_py(err: PoolError) -> PyErr {
    match err.kind() {
        ErrorKind::Validation => PyValueError::new_err(err.to_string()),
        ErrorKind::Unauthorized => PyPermissionError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

// ========================================================================
// Result Converters
// ========================================================================

pub fn event_to_py<'py>(py: Python<'py>, event: &Event) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("id", event.id)?;
    dict.set_item("name", &event.name)?;
    dict.set_item("description", &event.description)?;
    dict.set_item("trigger_threshold_bps", event.trigger_threshold_bps)?;
    dict.set_item("is_triggered", event.is_triggered)?;
    dict.set_item("trigger_time", event.trigger_time)?;
    dict.set_item("is_active", event.is_active)?;
    dict.set_item("total_coverage", event.total_coverage)?;
    dict.set_item("total_premiums", event.total_premiums)?;
    dict.set_item("accumulated_premiums", event.accumulated_premiums)?;
    dict.set_item("total_insurer_capital", event.total_insurer_capital)?;
    dict.set_item("total_payouts", event.total_payouts)?;
    dict.set_item("base_premium_bps", event.base_premium_bps)?;
    dict.set_item("expected_loss_ratio_bps", event.risk.expected_loss_ratio_bps)?;
    dict.set_item("total_loss_ratio_bps", event.risk.total_loss_ratio_bps)?;
    dict.set_item("max_premium_bps", event.risk.max_premium_bps)?;
    dict.set_item("last_distribution_time", event.last_distribution_time)?;
    Ok(dict)
}

pub fn policy_to_py<'py>(py: Python<'py>, policy: &Policy) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("id", policy.id)?;
    dict.set_item("holder", &policy.holder)?;
    dict.set_item("event_id", policy.event_id)?;
    dict.set_item("coverage", policy.coverage)?;
    dict.set_item("annualized_premium", policy.annualized_premium)?;
    dict.set_item("max_loss_limit", policy.max_loss_limit)?;
    dict.set_item("start_time", policy.start_time)?;
    dict.set_item("activation_time", policy.activation_time)?;
    dict.set_item("is_active", policy.is_active)?;
    dict.set_item("is_claimed", policy.is_claimed)?;
    dict.set_item("pending_premiums", policy.pending_premiums)?;
    dict.set_item("premiums_paid", policy.premiums_paid)?;
    Ok(dict)
}

pub fn collection_to_py<'py>(py: Python<'py>, result: &CollectionResult) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("event_id", result.event_id)?;
    dict.set_item("collected", result.collected)?;
    dict.set_item("policies_charged", result.policies_charged)?;
    dict.set_item("policies_skipped", result.policies_skipped)?;
    Ok(dict)
}

pub fn distribution_to_py<'py>(py: Python<'py>, result: &DistributionResult) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("event_id", result.event_id)?;
    dict.set_item("distributed", result.distributed)?;
    dict.set_item("insurer_share", result.insurer_share)?;
    dict.set_item("reinsurer_share", result.reinsurer_share)?;
    dict.set_item("protocol_fee", result.protocol_fee)?;
    dict.set_item("caller_reward", result.caller_reward)?;
    Ok(dict)
}

pub fn settlement_to_py<'py>(py: Python<'py>, result: &SettlementResult) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("event_id", result.event_id)?;
    dict.set_item("policies_paid", result.policies_paid)?;
    dict.set_item("total_payouts", result.total_payouts)?;
    dict.set_item("insurer_consumed", result.insurer_consumed)?;
    dict.set_item("reinsurer_consumed", result.reinsurer_consumed)?;
    Ok(dict)
}

pub fn reconciliation_to_py<'py>(py: Python<'py>, report: &ReconciliationReport) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("total_system_liquidity", report.total_system_liquidity)?;
    dict.set_item("total_balances", report.total_balances)?;
    dict.set_item("protocol_fees", report.protocol_fees)?;
    dict.set_item("total_deposited", report.total_deposited)?;
    dict.set_item("total_withdrawn", report.total_withdrawn)?;
    dict.set_item("custody", report.custody)?;
    dict.set_item("consistent", report.consistent)?;
    dict.set_item("issue", report.issue.as_deref())?;
    Ok(dict)
}
