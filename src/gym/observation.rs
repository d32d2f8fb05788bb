use std::str::FromStr;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{
    data::{column::FeatureCol, episode::EpisodeWindow},
    error::{DataError, EnvError, GymResult},
};

/// State vector handed to the agent.
pub type State = Array1<f64>;

/// Ordered selection of features exposed as the state vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateCols(Vec<FeatureCol>);

impl Default for StateCols {
    fn default() -> Self {
        Self(vec![
            FeatureCol::Hodl,
            FeatureCol::CloseChange,
            FeatureCol::Short,
            FeatureCol::Long,
            FeatureCol::Signal,
        ])
    }
}

impl StateCols {
    pub fn new(cols: impl IntoIterator<Item = FeatureCol>) -> Self {
        Self(cols.into_iter().collect())
    }

    /// Parses column names such as `["hodl", "close_change"]`.
    pub fn parse<S: AsRef<str>>(names: impl IntoIterator<Item = S>) -> GymResult<Self> {
        let cols = names
            .into_iter()
            .map(|n| FeatureCol::from_str(n.as_ref()).map_err(DataError::ParseColumn))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(cols))
    }

    pub fn as_slice(&self) -> &[FeatureCol] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> GymResult<()> {
        if self.0.is_empty() {
            return Err(EnvError::InvalidConfig("state_cols must not be empty".to_string()).into());
        }
        Ok(())
    }

    /// Reads the selected features at `row`, in selection order.
    ///
    /// `None` when `row` is outside the window.
    pub fn observe(&self, window: &EpisodeWindow, row: usize) -> Option<State> {
        self.0
            .iter()
            .map(|&c| window.value(c, row))
            .collect::<Option<Vec<_>>>()
            .map(Array1::from)
    }
}
