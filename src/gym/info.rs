use serde::{Deserialize, Serialize};

use crate::{
    data::episode::EpisodeWindow,
    gym::Reward,
    math::returns::compound,
};

/// Diagnostics returned with every step.
///
/// The return figures are multiplicative factors (1.0 = breakeven) compounded
/// over the rows *before* the one just stepped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub idx: usize,
    pub reward: Reward,
    /// Equity multiple of the agent's positions, net of commission.
    #[serde(rename = "model returns")]
    pub model_returns: f64,
    /// Buy-and-hold benchmark.
    #[serde(rename = "HODL returns")]
    pub hodl_returns: f64,
    /// Always-short benchmark.
    #[serde(rename = "SHORT returns")]
    pub short_returns: f64,
    /// Moving-average crossover benchmark.
    #[serde(rename = "mom returns")]
    pub mom_returns: f64,
}

impl StepInfo {
    /// Evaluates the benchmarks over rows `[0, idx)` of `window`.
    pub fn evaluate(window: &EpisodeWindow, idx: usize, reward: Reward) -> Self {
        let end = idx.min(window.len());
        let returns = &window.close_returns()[..end];

        Self {
            idx,
            reward,
            model_returns: compound(window.strategy_factors().take(end)),
            hodl_returns: compound(returns.iter().map(|r| 1.0 + r)),
            short_returns: compound(returns.iter().map(|r| 1.0 - r)),
            mom_returns: compound(
                returns
                    .iter()
                    .zip(window.mom_signal())
                    .map(|(r, m)| r * m + 1.0),
            ),
        }
    }
}
