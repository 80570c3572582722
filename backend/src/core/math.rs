//! Fixed-point arithmetic helpers
//!
//! CRITICAL: no floating point. Amounts are `u128` smallest units, ratios are
//! basis points (10_000 = 100%). Every helper is checked: overflow and division
//! by zero surface as [`MathError`] instead of wrapping or panicking.

use thiserror::Error;

/// Monetary amount in smallest units
pub type Amount = u128;

/// Ratio in basis points
pub type Bps = u64;

/// 100% in basis points
pub const BPS: Bps = 10_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Cannot apportion {remainder} unit(s): every share is at its cap")]
    Unapportionable { remainder: Amount },
}

pub fn add(a: Amount, b: Amount) -> Result<Amount, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn sub(a: Amount, b: Amount) -> Result<Amount, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

pub fn mul(a: Amount, b: Amount) -> Result<Amount, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

/// `a / b`, truncating toward zero
pub fn div(a: Amount, b: Amount) -> Result<Amount, MathError> {
    if b == 0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(a / b)
}

/// `a * b / denominator`, truncating toward zero
///
/// # Example
/// ```
/// use riskpool_core_rs::core::math::{mul_div, MathError};
///
/// assert_eq!(mul_div(5_000, 7_000, 10_000), Ok(3_500));
/// assert_eq!(mul_div(1, 1, 0), Err(MathError::DivisionByZero));
/// ```
pub fn mul_div(a: Amount, b: Amount, denominator: Amount) -> Result<Amount, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(mul(a, b)? / denominator)
}

/// Portion of `amount` given by `bps`
pub fn apply_bps(amount: Amount, bps: Bps) -> Result<Amount, MathError> {
    mul_div(amount, Amount::from(bps), Amount::from(BPS))
}

/// `numerator / denominator` expressed in basis points (not clamped)
pub fn ratio_bps(numerator: Amount, denominator: Amount) -> Result<Amount, MathError> {
    mul_div(numerator, Amount::from(BPS), denominator)
}

/// Sum a sequence of amounts with overflow detection
pub fn sum<I: IntoIterator<Item = Amount>>(values: I) -> Result<Amount, MathError> {
    values.into_iter().try_fold(0, add)
}

/// Pro-rata split of `total` by `weights`, truncating each share
///
/// Returns the shares (same order as `weights`) and the undistributed dust,
/// which is always smaller than the number of non-zero weights.
///
/// # Example
/// ```
/// use riskpool_core_rs::core::math::split_pro_rata;
///
/// let (shares, dust) = split_pro_rata(100, &[1, 1, 1]).unwrap();
/// assert_eq!(shares, vec![33, 33, 33]);
/// assert_eq!(dust, 1);
/// ```
pub fn split_pro_rata(total: Amount, weights: &[Amount]) -> Result<(Vec<Amount>, Amount), MathError> {
    let weight_sum = sum(weights.iter().copied())?;
    let shares = weights
        .iter()
        .map(|w| mul_div(total, *w, weight_sum))
        .collect::<Result<Vec<_>, _>>()?;
    let dust = sub(total, sum(shares.iter().copied())?)?;
    Ok((shares, dust))
}

/// Pro-rata split of `total` that distributes every unit
///
/// Shares are truncated first; the remainder is then handed out one unit at
/// a time, largest weight first, skipping any share already at its cap.
/// `caps[i]` bounds `shares[i]`, so the caller must guarantee
/// `sum(caps) >= total`.
///
/// # Example
/// ```
/// use riskpool_core_rs::core::math::apportion_exact;
///
/// let shares = apportion_exact(100, &[1, 1, 1], &[50, 50, 50]).unwrap();
/// assert_eq!(shares.iter().sum::<u128>(), 100);
/// ```
pub fn apportion_exact(
    total: Amount,
    weights: &[Amount],
    caps: &[Amount],
) -> Result<Vec<Amount>, MathError> {
    debug_assert_eq!(weights.len(), caps.len());
    let (mut shares, mut remainder) = split_pro_rata(total, weights)?;
    for (share, cap) in shares.iter_mut().zip(caps) {
        if *share > *cap {
            remainder = add(remainder, *share - *cap)?;
            *share = *cap;
        }
    }

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|a, b| weights[*b].cmp(&weights[*a]).then(a.cmp(b)));

    while remainder > 0 {
        let mut placed = false;
        for &i in &order {
            if remainder == 0 {
                break;
            }
            if shares[i] < caps[i] {
                shares[i] += 1;
                remainder -= 1;
                placed = true;
            }
        }
        if !placed {
            return Err(MathError::Unapportionable { remainder });
        }
    }
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_ops() {
        assert_eq!(add(Amount::MAX, 1), Err(MathError::Overflow));
        assert_eq!(sub(0, 1), Err(MathError::Underflow));
        assert_eq!(div(10, 0), Err(MathError::DivisionByZero));
        assert_eq!(div(10, 3), Ok(3));
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(10_000, 50), Ok(50));
        assert_eq!(apply_bps(999, 7_000), Ok(699));
    }

    #[test]
    fn test_split_pro_rata_zero_weights() {
        assert_eq!(split_pro_rata(10, &[0, 0]), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_apportion_exact_respects_caps() {
        // 2:1 weights, but the heavy share is capped below its pro-rata portion
        let shares = apportion_exact(90, &[200, 100], &[50, 100]).unwrap();
        assert_eq!(shares, vec![50, 40]);
    }

    #[test]
    fn test_apportion_exact_remainder_goes_to_largest() {
        let shares = apportion_exact(10, &[5, 3, 2], &[10, 10, 10]).unwrap();
        assert_eq!(shares, vec![5, 3, 2]);

        let shares = apportion_exact(7, &[1, 1, 1], &[7, 7, 7]).unwrap();
        assert_eq!(shares, vec![3, 2, 2]);
    }

    #[test]
    fn test_apportion_exact_insufficient_caps() {
        let err = apportion_exact(10, &[1, 1], &[2, 2]).unwrap_err();
        assert_eq!(err, MathError::Unapportionable { remainder: 6 });
    }
}
