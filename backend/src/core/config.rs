//! Pool configuration
//!
//! All tunables of the ledger live here. The core crate never reads files or
//! environment variables; callers (CLI, FFI, tests) construct or deserialize a
//! [`PoolConfig`] and hand it to the engine.

use crate::core::math::{Amount, Bps, BPS};
use crate::core::time::{DEFAULT_LOCKUP_PERIOD, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Complete pool configuration
///
/// # Example
/// ```
/// use riskpool_core_rs::PoolConfig;
///
/// let config = PoolConfig::default();
/// assert_eq!(config.insurer_claim_share_bps, 7_000);
/// assert_eq!(config.unit(), 1_000_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Decimal places of the payment asset (1 unit = 10^decimals)
    pub amount_decimals: u32,

    /// Minimum collateral to register as insurer or reinsurer (smallest units)
    pub min_collateral: Amount,

    /// Seconds between policy purchase and earliest activation
    pub lockup_period_secs: u64,

    /// Lower bound for the interval accepted by `distribute_periodically`
    pub min_distribution_interval_secs: u64,

    /// Caller incentive withheld from periodic distributions
    pub gratification_bps: Bps,

    /// Protocol fee withheld from every distribution
    pub protocol_fee_bps: Bps,

    /// Share of claim payouts consumed from insurer capital (rest from reinsurers)
    pub insurer_claim_share_bps: Bps,

    /// Risk loading `mu` used by the beta formula
    pub risk_loading_bps: Bps,

    /// Expected loss ratio assigned to newly registered events
    pub default_expected_loss_ratio_bps: Bps,

    /// Total loss ratio assigned to newly registered events
    pub default_total_loss_ratio_bps: Bps,

    /// Max premium of a new event = multiplier x base premium
    pub max_premium_multiplier: u64,

    /// Premium seconds a policyholder must keep available while covered
    pub policy_reserve_window_secs: u64,

    /// Participants holding the registrar capability
    pub registrars: Vec<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            amount_decimals: 6,
            min_collateral: 1_000 * 1_000_000,
            lockup_period_secs: DEFAULT_LOCKUP_PERIOD,
            min_distribution_interval_secs: SECONDS_PER_DAY,
            gratification_bps: 50,
            protocol_fee_bps: 0,
            insurer_claim_share_bps: 7_000,
            risk_loading_bps: 500,
            default_expected_loss_ratio_bps: 500,
            default_total_loss_ratio_bps: 15_000,
            max_premium_multiplier: 10,
            policy_reserve_window_secs: 30 * SECONDS_PER_DAY,
            registrars: Vec::new(),
        }
    }
}

impl PoolConfig {
    /// One whole unit of the payment asset in smallest units
    pub fn unit(&self) -> Amount {
        Amount::from(10u64.pow(self.amount_decimals.min(18)))
    }

    /// Check whether `participant` holds the registrar capability
    pub fn is_registrar(&self, participant: &str) -> bool {
        self.registrars.iter().any(|r| r == participant)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.amount_decimals > 18 {
            return Err(ConfigError::Invalid(format!(
                "amount_decimals must be <= 18, got {}",
                self.amount_decimals
            )));
        }

        if self.min_collateral == 0 {
            return Err(ConfigError::Invalid(
                "min_collateral must be > 0".to_string(),
            ));
        }

        let bps_fields = [
            ("gratification_bps", self.gratification_bps),
            ("protocol_fee_bps", self.protocol_fee_bps),
            ("insurer_claim_share_bps", self.insurer_claim_share_bps),
            ("default_expected_loss_ratio_bps", self.default_expected_loss_ratio_bps),
        ];
        for (name, value) in bps_fields {
            if value > BPS {
                return Err(ConfigError::Invalid(format!(
                    "{} must be <= {}, got {}",
                    name, BPS, value
                )));
            }
        }

        if self.gratification_bps + self.protocol_fee_bps > BPS {
            return Err(ConfigError::Invalid(
                "gratification_bps + protocol_fee_bps must not exceed 100%".to_string(),
            ));
        }

        if self.risk_loading_bps == 0 {
            return Err(ConfigError::Invalid(
                "risk_loading_bps must be > 0".to_string(),
            ));
        }

        if self.default_expected_loss_ratio_bps == 0 || self.default_total_loss_ratio_bps == 0 {
            return Err(ConfigError::Invalid(
                "default loss ratios must be > 0".to_string(),
            ));
        }

        if self.max_premium_multiplier == 0 {
            return Err(ConfigError::Invalid(
                "max_premium_multiplier must be > 0".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for registrar in &self.registrars {
            if !seen.insert(registrar) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate registrar: {}",
                    registrar
                )));
            }
        }

        Ok(())
    }
}
