use polars::prelude::PlSmallStr;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Columns of the raw input price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SeriesCol {
    /// Bar timestamp, strictly increasing after loading.
    Timestamp,
    Close,
}

/// Numeric columns of the feature table and the episode window.
///
/// Every variant can be selected as a state feature. `Signal` and `Commission`
/// only carry non-zero values inside an episode window; on the master table they
/// read as zero.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeatureCol {
    Close,
    /// Fractional change of `close` against the previous row.
    CloseChange,
    /// Buy-and-hold value index, 1.0 at the first row.
    Hodl,
    /// Trailing mean of `hodl` over the short window.
    Short,
    /// Trailing mean of `hodl` over the long window.
    Long,
    /// Moving-average crossover position: -1, 0 or 1.
    MomSignal,
    /// Next row's `close_change`.
    CloseReturns,
    /// Position held going into the period.
    Signal,
    /// Commission charged at the row.
    Commission,
}

impl From<SeriesCol> for PlSmallStr {
    fn from(value: SeriesCol) -> Self {
        value.as_str().into()
    }
}

impl From<FeatureCol> for PlSmallStr {
    fn from(value: FeatureCol) -> Self {
        value.as_str().into()
    }
}

impl SeriesCol {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl FeatureCol {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Returns `true` for the columns written by `step` during an episode.
    pub fn is_episode_annotation(&self) -> bool {
        matches!(self, Self::Signal | Self::Commission)
    }
}
