use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    data::features::FeatureWindows,
    error::{EnvError, GymResult, IoError},
    gym::observation::StateCols,
};

/// Default number of rows per episode.
pub const DEFAULT_EPISODE_LEN: usize = 600;

/// Default commission per side, 5 bps.
pub const DEFAULT_COMMISSION: f64 = 0.0005;

/// Configuration blueprint for an [`Environment`](crate::gym::env::Environment).
///
/// Every field has a default, so partial JSON documents are accepted:
///
/// ```
/// # use single_stock_gym::prelude::*;
/// let cfg = EnvConfig::from_json(r#"{ "episode_len": 250, "state_cols": ["hodl", "signal"] }"#)
///     .unwrap();
/// assert_eq!(cfg.episode_len(), 250);
/// assert_eq!(cfg.short_window(), 15);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Rows per episode window.
    episode_len: usize,

    /// Rolling window (rows) of the short moving average of `hodl`.
    short_window: usize,

    /// Rolling window (rows) of the long moving average of `hodl`.
    long_window: usize,

    /// Features exposed in the state vector, in order.
    state_cols: StateCols,

    /// Commission per side as a fraction of notional.
    commission: f64,

    /// Seed for episode sampling. `None` seeds from the operating system.
    seed: Option<u64>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        let windows = FeatureWindows::default();
        Self {
            episode_len: DEFAULT_EPISODE_LEN,
            short_window: windows.short,
            long_window: windows.long,
            state_cols: StateCols::default(),
            commission: DEFAULT_COMMISSION,
            seed: None,
        }
    }
}

impl EnvConfig {
    pub fn from_json(json: &str) -> GymResult<Self> {
        let cfg = serde_json::from_str(json).map_err(IoError::Json)?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> GymResult<Self> {
        let raw = fs::read_to_string(path).map_err(IoError::Io)?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> GymResult<String> {
        Ok(serde_json::to_string_pretty(self).map_err(IoError::Json)?)
    }

    pub fn with_episode_len(self, episode_len: usize) -> Self {
        Self {
            episode_len,
            ..self
        }
    }

    pub fn with_short_window(self, short_window: usize) -> Self {
        Self {
            short_window,
            ..self
        }
    }

    pub fn with_long_window(self, long_window: usize) -> Self {
        Self {
            long_window,
            ..self
        }
    }

    pub fn with_state_cols(self, state_cols: StateCols) -> Self {
        Self { state_cols, ..self }
    }

    pub fn with_commission(self, commission: f64) -> Self {
        Self { commission, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn episode_len(&self) -> usize {
        self.episode_len
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }

    pub fn windows(&self) -> FeatureWindows {
        FeatureWindows {
            short: self.short_window,
            long: self.long_window,
        }
    }

    pub fn state_cols(&self) -> &StateCols {
        &self.state_cols
    }

    pub fn commission(&self) -> f64 {
        self.commission
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Checks the settings that do not depend on the price series.
    pub fn validate(&self) -> GymResult<()> {
        self.windows().validate()?;
        self.state_cols.validate()?;

        if self.episode_len < 2 {
            return Err(invalid(format!(
                "episode_len must be at least 2, got {}",
                self.episode_len
            )));
        }
        if !self.commission.is_finite() || self.commission < 0.0 {
            return Err(invalid(format!(
                "commission must be a finite, non-negative rate, got {}",
                self.commission
            )));
        }
        Ok(())
    }

    /// Checks that an episode window can be sampled from `rows` master rows.
    pub fn validate_for(&self, rows: usize) -> GymResult<()> {
        self.validate()?;
        if self.episode_len >= rows {
            return Err(invalid(format!(
                "episode_len ({}) must be smaller than the number of price rows ({rows})",
                self.episode_len
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> crate::error::GymError {
    EnvError::InvalidConfig(msg).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::column::FeatureCol, error::GymError};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EnvConfig::default();
        assert_eq!(cfg.episode_len(), 600);
        assert_eq!(cfg.short_window(), 15);
        assert_eq!(cfg.long_window(), 60);
        assert_eq!(cfg.commission(), 0.0005);
        assert_eq!(cfg.state_cols(), &StateCols::default());
        assert_eq!(cfg.seed(), None);
    }

    #[test]
    fn json_round_trip() {
        let cfg = EnvConfig::default()
            .with_episode_len(100)
            .with_commission(0.001)
            .with_state_cols(StateCols::new([FeatureCol::Hodl, FeatureCol::MomSignal]))
            .with_seed(42);
        let back = EnvConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn rejects_invalid_settings() {
        let is_config_err =
            |r: GymResult<()>| matches!(r, Err(GymError::Env(EnvError::InvalidConfig(_))));

        assert!(is_config_err(EnvConfig::default().with_short_window(0).validate()));
        assert!(is_config_err(EnvConfig::default().with_long_window(0).validate()));
        assert!(is_config_err(EnvConfig::default().with_episode_len(1).validate()));
        assert!(is_config_err(EnvConfig::default().with_commission(-0.1).validate()));
        assert!(is_config_err(
            EnvConfig::default().with_commission(f64::NAN).validate()
        ));
        assert!(is_config_err(
            EnvConfig::default()
                .with_state_cols(StateCols::new([]))
                .validate()
        ));
        assert!(is_config_err(
            EnvConfig::default().with_episode_len(10).validate_for(10)
        ));
        assert!(EnvConfig::default().with_episode_len(10).validate_for(11).is_ok());
    }

    #[test]
    fn unknown_state_column_fails_to_parse() {
        let err = EnvConfig::from_json(r#"{ "state_cols": ["volume"] }"#).unwrap_err();
        assert!(matches!(err, GymError::Io(IoError::Json(_))));
    }
}
