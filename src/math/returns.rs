//! Compounded-return helpers shared by the reward and the step diagnostics.

/// Scale applied to the raw equity change before rounding.
pub const REWARD_SCALE: f64 = 1000.0;

/// Decimal places kept on the scaled reward.
pub const REWARD_DECIMALS: i32 = 6;

/// Growth factor of a position over one period: `(close_return + commission) * signal + 1`.
#[inline]
pub fn strategy_factor(close_return: f64, commission: f64, signal: f64) -> f64 {
    (close_return + commission) * signal + 1.0
}

/// Running product of `factors`.
pub fn cumulative_product(factors: impl IntoIterator<Item = f64>) -> Vec<f64> {
    factors
        .into_iter()
        .scan(1.0, |acc, f| {
            *acc *= f;
            Some(*acc)
        })
        .collect()
}

/// Product of `factors`; `1.0` for an empty sequence.
pub fn compound(factors: impl IntoIterator<Item = f64>) -> f64 {
    factors.into_iter().product()
}

/// First difference of `curve` at `idx`. Undefined at `idx == 0` and therefore zero,
/// as is any NaN difference.
pub fn period_change(curve: &[f64], idx: usize) -> f64 {
    let diff = match idx.checked_sub(1) {
        Some(prev) if idx < curve.len() => curve[idx] - curve[prev],
        _ => return 0.0,
    };
    if diff.is_nan() { 0.0 } else { diff }
}

/// Rounds half-to-even at `decimals` places.
pub fn round_dp(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Scales a raw equity change into the reward unit.
pub fn scale_reward(change: f64) -> f64 {
    round_dp(change * REWARD_SCALE, REWARD_DECIMALS)
}
