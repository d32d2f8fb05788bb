use std::ops::Range;

use chrono::{DateTime, Utc};
use polars::prelude::{
    DataFrame, Expr, IntoLazy, LazyFrame, RollingOptionsFixedWindow, col, lit, when,
};
use serde::{Deserialize, Serialize};

use crate::{
    data::{column::FeatureCol, column::SeriesCol, series::PriceSeries},
    error::{EnvError, GymError, GymResult, polars_to_gym_error},
};

/// Moving-average windows for the momentum features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureWindows {
    pub short: usize,
    pub long: usize,
}

impl Default for FeatureWindows {
    fn default() -> Self {
        Self {
            short: 15,
            long: 60,
        }
    }
}

impl FeatureWindows {
    pub fn validate(&self) -> GymResult<()> {
        if self.short == 0 || self.long == 0 {
            return Err(EnvError::InvalidConfig(format!(
                "moving-average windows must be positive (short: {}, long: {})",
                self.short, self.long
            ))
            .into());
        }
        Ok(())
    }

    /// Builds the lazy feature pipeline on top of a `timestamp`/`close` frame.
    ///
    /// Boundary values are zero by contract: the first `close_change`, the last
    /// `close_returns`, and any NaN produced by a 0/0 change.
    pub fn derive(&self, lf: LazyFrame) -> LazyFrame {
        let close_change = (col(SeriesCol::Close) / col(SeriesCol::Close).shift(lit(1)) - lit(1.0))
            .fill_null(lit(0.0))
            .fill_nan(lit(0.0));

        lf.with_column(col(SeriesCol::Close).alias(FeatureCol::Close))
            .with_column(close_change.alias(FeatureCol::CloseChange))
            .with_column(
                (col(FeatureCol::CloseChange) + lit(1.0))
                    .cum_prod(false)
                    .alias(FeatureCol::Hodl),
            )
            .with_columns([
                trailing_mean(FeatureCol::Hodl, self.short).alias(FeatureCol::Short),
                trailing_mean(FeatureCol::Hodl, self.long).alias(FeatureCol::Long),
                col(FeatureCol::CloseChange)
                    .shift(lit(-1))
                    .fill_null(lit(0.0))
                    .alias(FeatureCol::CloseReturns),
            ])
            .with_column(self.mom_signal().alias(FeatureCol::MomSignal))
            .select(
                [col(SeriesCol::Timestamp)]
                    .into_iter()
                    .chain(MASTER_COLS.iter().map(|&c| col(c)))
                    .collect::<Vec<Expr>>(),
            )
    }

    /// Crossover position, 0 while fewer than `short` rows precede the current one.
    fn mom_signal(&self) -> Expr {
        // `shift(short)` is null exactly for the first `short` rows.
        let warming_up = col(FeatureCol::Hodl)
            .shift(lit(self.short as i64))
            .is_null();

        when(warming_up)
            .then(lit(0.0))
            .when(col(FeatureCol::Short).gt(col(FeatureCol::Long)))
            .then(lit(1.0))
            .otherwise(lit(-1.0))
    }
}

/// Columns materialized on the master table, in frame order after `timestamp`.
pub const MASTER_COLS: [FeatureCol; 7] = [
    FeatureCol::Close,
    FeatureCol::CloseChange,
    FeatureCol::Hodl,
    FeatureCol::Short,
    FeatureCol::Long,
    FeatureCol::MomSignal,
    FeatureCol::CloseReturns,
];

/// Typed columns of the derived feature table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureColumns {
    pub close: Vec<f64>,
    pub close_change: Vec<f64>,
    pub hodl: Vec<f64>,
    pub short: Vec<f64>,
    pub long: Vec<f64>,
    pub mom_signal: Vec<f64>,
    pub close_returns: Vec<f64>,
}

impl FeatureColumns {
    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Returns the column for a derived feature, `None` for episode annotations.
    pub fn get(&self, c: FeatureCol) -> Option<&[f64]> {
        let values = match c {
            FeatureCol::Close => &self.close,
            FeatureCol::CloseChange => &self.close_change,
            FeatureCol::Hodl => &self.hodl,
            FeatureCol::Short => &self.short,
            FeatureCol::Long => &self.long,
            FeatureCol::MomSignal => &self.mom_signal,
            FeatureCol::CloseReturns => &self.close_returns,
            FeatureCol::Signal | FeatureCol::Commission => return None,
        };
        Some(values)
    }

    /// Owned copy of the rows in `range`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        Self {
            close: self.close[range.clone()].to_vec(),
            close_change: self.close_change[range.clone()].to_vec(),
            hodl: self.hodl[range.clone()].to_vec(),
            short: self.short[range.clone()].to_vec(),
            long: self.long[range.clone()].to_vec(),
            mom_signal: self.mom_signal[range.clone()].to_vec(),
            close_returns: self.close_returns[range].to_vec(),
        }
    }

    fn from_df(df: &DataFrame) -> GymResult<Self> {
        let extract = |c: FeatureCol| -> GymResult<Vec<f64>> {
            let ca = df
                .column(c.as_str())
                .and_then(|s| s.f64())
                .map_err(convert_err)?;
            Ok(ca.into_iter().map(|v| v.unwrap_or(0.0)).collect())
        };

        Ok(Self {
            close: extract(FeatureCol::Close)?,
            close_change: extract(FeatureCol::CloseChange)?,
            hodl: extract(FeatureCol::Hodl)?,
            short: extract(FeatureCol::Short)?,
            long: extract(FeatureCol::Long)?,
            mom_signal: extract(FeatureCol::MomSignal)?,
            close_returns: extract(FeatureCol::CloseReturns)?,
        })
    }
}

/// The processed price table. Built once, never mutated afterwards; episodes copy
/// slices out of it.
#[derive(Debug, Clone)]
pub struct MasterTable {
    windows: FeatureWindows,
    timestamps: Vec<DateTime<Utc>>,
    columns: FeatureColumns,
    df: DataFrame,
}

impl MasterTable {
    #[tracing::instrument(skip(series), fields(rows = series.len()))]
    pub fn build(series: &PriceSeries, windows: FeatureWindows) -> GymResult<Self> {
        windows.validate()?;

        let df = windows
            .derive(series.to_df()?.lazy())
            .collect()
            .map_err(convert_err)?;
        let columns = FeatureColumns::from_df(&df)?;

        tracing::debug!(
            short_window = windows.short,
            long_window = windows.long,
            "Derived master feature table"
        );

        Ok(Self {
            windows,
            timestamps: series.timestamps().to_vec(),
            columns,
            df,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn windows(&self) -> FeatureWindows {
        self.windows
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn columns(&self) -> &FeatureColumns {
        &self.columns
    }

    /// Value of a feature at `row`. Episode annotations read as zero.
    pub fn value(&self, c: FeatureCol, row: usize) -> Option<f64> {
        match self.columns.get(c) {
            Some(values) => values.get(row).copied(),
            None if c.is_episode_annotation() => (row < self.len()).then_some(0.0),
            None => None,
        }
    }

    /// The derived table as a polars frame (`timestamp` followed by the feature columns).
    pub fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================
fn trailing_mean(c: FeatureCol, window: usize) -> Expr {
    let options = RollingOptionsFixedWindow {
        window_size: window,
        min_periods: 1,
        weights: None,
        center: false,
        fn_params: None,
    };
    col(c).rolling_mean(options)
}

fn convert_err(e: polars::error::PolarsError) -> GymError {
    polars_to_gym_error("feature table", e)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::data::series::PriceRecord;

    const EPS: f64 = 1e-12;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceSeries::from_records(closes.iter().enumerate().map(|(i, &close)| PriceRecord {
            timestamp: start + Duration::days(i as i64),
            close,
        }))
        .unwrap()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < EPS, "row {i}: expected {e}, got {a}");
        }
    }

    #[test]
    fn derives_changes_hodl_and_forward_returns() {
        let closes = [100.0, 101.0, 102.0, 99.0, 99.0, 100.0];
        let table = MasterTable::build(&series(&closes), FeatureWindows::default()).unwrap();
        let cols = table.columns();

        assert_close(
            &cols.close_change,
            &[0.0, 0.01, 1.0 / 101.0, -3.0 / 102.0, 0.0, 1.0 / 99.0],
        );
        assert_close(&cols.hodl, &[1.0, 1.01, 1.02, 0.99, 0.99, 1.0]);
        assert_close(
            &cols.close_returns,
            &[0.01, 1.0 / 101.0, -3.0 / 102.0, 0.0, 1.0 / 99.0, 0.0],
        );
        assert_eq!(cols.hodl[0], 1.0);
    }

    #[test]
    fn annotation_values_read_as_zero_within_the_table() {
        let table = MasterTable::build(&series(&[100.0, 101.0, 102.0]), FeatureWindows::default())
            .unwrap();
        assert_eq!(table.value(FeatureCol::Commission, 2), Some(0.0));
        assert_eq!(table.value(FeatureCol::Signal, 3), None);
        assert_eq!(table.value(FeatureCol::Close, 1), Some(101.0));
    }

    #[test]
    fn rolling_means_start_from_one_row() {
        let closes = [100.0, 101.0, 102.0, 99.0, 99.0, 100.0];
        let windows = FeatureWindows { short: 2, long: 3 };
        let table = MasterTable::build(&series(&closes), windows).unwrap();
        let cols = table.columns();

        assert_close(&cols.short, &[1.0, 1.005, 1.015, 1.005, 0.99, 0.995]);
        assert_close(
            &cols.long,
            &[1.0, 1.005, 1.01, 3.02 / 3.0, 3.0 / 3.0, 2.98 / 3.0],
        );
    }

    #[test]
    fn mom_signal_is_zero_during_warm_up() {
        let closes = [100.0, 101.0, 102.0, 99.0, 99.0, 100.0];
        let windows = FeatureWindows { short: 2, long: 3 };
        let table = MasterTable::build(&series(&closes), windows).unwrap();
        let cols = table.columns();

        assert_eq!(&cols.mom_signal[..2], &[0.0, 0.0]);
        for r in 2..cols.len() {
            let expected = if cols.short[r] > cols.long[r] { 1.0 } else { -1.0 };
            assert_eq!(cols.mom_signal[r], expected, "row {r}");
        }
    }

    #[test]
    fn short_window_longer_than_series_never_signals() {
        let table =
            MasterTable::build(&series(&[100.0, 101.0, 102.0]), FeatureWindows::default()).unwrap();
        assert!(table.columns().mom_signal.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_window_is_a_configuration_error() {
        let err = MasterTable::build(&series(&[1.0, 2.0]), FeatureWindows { short: 0, long: 3 })
            .unwrap_err();
        assert!(matches!(err, GymError::Env(EnvError::InvalidConfig(_))));
    }

    #[test]
    fn annotations_read_as_zero_on_master() {
        let table = MasterTable::build(&series(&[1.0, 2.0]), FeatureWindows::default()).unwrap();
        assert_eq!(table.value(FeatureCol::Signal, 1), Some(0.0));
        assert_eq!(table.value(FeatureCol::Commission, 2), None);
        assert_eq!(table.value(FeatureCol::Close, 1), Some(2.0));
        assert_eq!(table.as_df().width(), 1 + MASTER_COLS.len());
    }
}
