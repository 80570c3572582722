//! Closed-form risk-sharing model
//!
//! All inputs and outputs are integers: ratios in basis points, amounts in
//! smallest units. Every division goes through [`math::mul_div`], which
//! rejects a zero denominator with `DivisionByZero`.
//!
//! Notation: `C` insurer capital on the event, `N` policy notional,
//! `R` reinsurance capital, `T` total capital.

use crate::core::math::{self, Amount, MathError, BPS};

/// Lower bound for the solved event probability (1%)
pub const MIN_PROBABILITY_BPS: Amount = 100;

/// Upper bound for the solved event probability (50%)
pub const MAX_PROBABILITY_BPS: Amount = 5_000;

/// Max premium bounds as multiples of insurer capital: `[C / 10, 10 C]`
pub const MAX_PREMIUM_FLOOR_DIVISOR: Amount = 10;
pub const MAX_PREMIUM_CAP_MULTIPLIER: Amount = 10;

/// Result of the two-equation solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbabilitySolution {
    pub alpha_bps: Amount,
    pub probability_bps: Amount,
    pub max_premium: Amount,
}

/// Insurer risk weight: `mu * (C / N) / elr_sum`
///
/// # Example
/// ```
/// use riskpool_core_rs::pricing::model::beta;
///
/// // capital equal to notional, single event at 5% elr, 5% loading
/// assert_eq!(beta(1_000, 1_000, 500, 500).unwrap(), 10_000);
/// assert!(beta(1_000, 0, 500, 500).is_err());
/// ```
pub fn beta(
    insurer_capital: Amount,
    policy_notional: Amount,
    expected_loss_ratio_sum: Amount,
    risk_loading_bps: u64,
) -> Result<Amount, MathError> {
    let capital_ratio = math::mul_div(insurer_capital, Amount::from(BPS), policy_notional)?;
    math::mul_div(
        Amount::from(risk_loading_bps),
        capital_ratio,
        expected_loss_ratio_sum,
    )
}

/// Reinsurance share of total capital in bps; zero without reinsurers
pub fn reinsurance_share(reinsurance_capital: Amount, total_capital: Amount) -> Result<Amount, MathError> {
    if reinsurance_capital == 0 {
        return Ok(0);
    }
    math::mul_div(reinsurance_capital, Amount::from(BPS), total_capital)
}

/// Solve for the event probability `p` and max premium `M`
///
/// `M = p * alpha * N` and `M = C * elr + p * C` give
/// `p = elr / (alpha * N / C - 1)`. When the leverage `alpha * N / C` is at
/// most 1 the closed form has no positive solution and `p` falls back to
/// `elr`. Both outputs are clamped to hard bounds.
#[allow(clippy::too_many_arguments)]
pub fn solve_event_probability_and_max_premium(
    insurer_capital: Amount,
    policy_notional: Amount,
    beta_bps: Amount,
    expected_loss_ratio_bps: Amount,
    total_loss_ratio_bps: Amount,
    reinsurance_capital: Amount,
    total_capital: Amount,
) -> Result<ProbabilitySolution, MathError> {
    let r_bps = reinsurance_share(reinsurance_capital, total_capital)?;
    let alpha_bps = insurer_weighted(total_loss_ratio_bps, beta_bps, r_bps)?;
    let leverage_bps = math::mul_div(alpha_bps, policy_notional, insurer_capital)?;

    let bps = Amount::from(BPS);
    let probability_bps = if leverage_bps <= bps {
        expected_loss_ratio_bps
    } else {
        math::mul_div(expected_loss_ratio_bps, bps, leverage_bps - bps)?
    }
    .clamp(MIN_PROBABILITY_BPS, MAX_PROBABILITY_BPS);

    let raw_premium = math::mul_div(
        math::mul(probability_bps, alpha_bps)?,
        policy_notional,
        math::mul(bps, bps)?,
    )?;
    let floor = insurer_capital / MAX_PREMIUM_FLOOR_DIVISOR;
    let cap = math::mul(insurer_capital, MAX_PREMIUM_CAP_MULTIPLIER)?;

    Ok(ProbabilitySolution {
        alpha_bps,
        probability_bps,
        max_premium: raw_premium.clamp(floor, cap),
    })
}

/// Insurer part of `max_premium`: `beta / (beta + R / T) * max_premium`
pub fn shared_risk_premium(
    beta_bps: Amount,
    reinsurance_capital: Amount,
    total_capital: Amount,
    max_premium: Amount,
) -> Result<Amount, MathError> {
    let r_bps = reinsurance_share(reinsurance_capital, total_capital)?;
    insurer_weighted(max_premium, beta_bps, r_bps)
}

/// `value * beta / (beta + r)`
///
/// Both weights round to zero when an event is levered far beyond its
/// capital and reinsurance is absent or negligible. Insurers then carry the
/// whole risk and `value` is returned unscaled.
fn insurer_weighted(value: Amount, beta_bps: Amount, r_bps: Amount) -> Result<Amount, MathError> {
    let weight = math::add(beta_bps, r_bps)?;
    if weight == 0 {
        return Ok(value);
    }
    math::mul_div(value, beta_bps, weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: Amount = 1_000_000;

    #[test]
    fn test_beta_scales_with_capital_ratio() {
        let full = beta(10_000 * UNIT, 10_000 * UNIT, 500, 500).unwrap();
        let half = beta(5_000 * UNIT, 10_000 * UNIT, 500, 500).unwrap();
        assert_eq!(full, 10_000);
        assert_eq!(half, 5_000);
    }

    #[test]
    fn test_solve_without_reinsurance() {
        let c = 10_000 * UNIT;
        let solution = solve_event_probability_and_max_premium(c, c, 10_000, 500, 15_000, 0, c).unwrap();
        // alpha = tlr, leverage 1.5 -> p = 5% / 0.5 = 10%
        assert_eq!(solution.alpha_bps, 15_000);
        assert_eq!(solution.probability_bps, 1_000);
        assert_eq!(solution.max_premium, 1_500 * UNIT);
    }

    #[test]
    fn test_low_leverage_falls_back_to_elr() {
        let c = 10_000 * UNIT;
        // notional far below capital
        let solution =
            solve_event_probability_and_max_premium(c, c / 100, 10_000, 500, 15_000, 0, c).unwrap();
        assert_eq!(solution.probability_bps, 500);
        assert_eq!(solution.max_premium, c / 10);
    }

    #[test]
    fn test_probability_clamped_high() {
        let c = 1_000 * UNIT;
        // leverage barely above 1 drives p towards infinity
        let solution =
            solve_event_probability_and_max_premium(c, c, 10_000, 500, 10_001, 0, c).unwrap();
        assert_eq!(solution.probability_bps, MAX_PROBABILITY_BPS);
    }

    #[test]
    fn test_max_premium_capped() {
        let c = 100 * UNIT;
        let solution =
            solve_event_probability_and_max_premium(c, 1_000_000 * UNIT, 10_000, 500, 15_000, 0, c)
                .unwrap();
        assert_eq!(solution.max_premium, 10 * c);
    }

    #[test]
    fn test_shared_risk_premium_splits_with_reinsurance() {
        // R/T = 25%, beta = 75% -> insurer gets 3/4
        assert_eq!(shared_risk_premium(7_500, 250, 1_000, 1_000).unwrap(), 750);
        // no reinsurance -> insurer gets everything
        assert_eq!(shared_risk_premium(7_500, 0, 1_000, 1_000).unwrap(), 1_000);
    }

    #[test]
    fn test_zero_weights_leave_risk_with_insurers() {
        // beta and R / T both truncate to zero
        assert_eq!(shared_risk_premium(0, 0, 1_000, 1_000).unwrap(), 1_000);
        assert_eq!(shared_risk_premium(0, 1, 1_000_000, 1_000).unwrap(), 1_000);
    }

    #[test]
    fn test_solve_with_zero_beta_still_clamped() {
        let c = UNIT;
        let n = 20_000 * UNIT;
        let solution = solve_event_probability_and_max_premium(c, n, 0, 500, 15_000, 0, c).unwrap();
        assert_eq!(solution.alpha_bps, 15_000);
        assert_eq!(solution.probability_bps, MIN_PROBABILITY_BPS);
        assert_eq!(solution.max_premium, 10 * c);
    }

    #[test]
    fn test_zero_denominators_rejected() {
        assert_eq!(reinsurance_share(10, 0), Err(MathError::DivisionByZero));
    }
}
