use chrono::{DateTime, Utc};
use polars::prelude::{
    Column, DataFrame, DataType, IntoColumn, IntoLazy, NamedFrom, Series, TimeUnit, TimeZone, col,
};
use strum::IntoEnumIterator;

use crate::{
    data::{
        column::{FeatureCol, SeriesCol},
        features::{FeatureColumns, MASTER_COLS, MasterTable},
    },
    error::{EnvError, GymError, GymResult, polars_to_gym_error},
    math::returns::{cumulative_product, strategy_factor},
};

/// Equity curve column names used by [`EpisodeWindow::to_df`].
pub const MODEL_EQUITY_COL: &str = "model_equity";
pub const HODL_EQUITY_COL: &str = "hodl_equity";

/// An owned copy of `len` consecutive master rows, annotated with the
/// agent's `signal` and the `commission` charged per row.
///
/// Writes go to this copy only; the master table is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeWindow {
    start: usize,
    timestamps: Vec<DateTime<Utc>>,
    features: FeatureColumns,
    signal: Vec<f64>,
    commission: Vec<f64>,
}

impl EpisodeWindow {
    /// Copies rows `[start, start + len)` out of the master table.
    pub fn sample(master: &MasterTable, start: usize, len: usize) -> GymResult<Self> {
        let end = start
            .checked_add(len)
            .filter(|&end| end <= master.len())
            .ok_or(EnvError::InvalidStart {
                start,
                len,
                rows: master.len(),
            })?;

        Ok(Self {
            start,
            timestamps: master.timestamps()[start..end].to_vec(),
            features: master.columns().slice(start..end),
            signal: vec![0.0; len],
            commission: vec![0.0; len],
        })
    }

    /// Offset of the first row within the master table.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn features(&self) -> &FeatureColumns {
        &self.features
    }

    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    pub fn commission(&self) -> &[f64] {
        &self.commission
    }

    pub fn close_returns(&self) -> &[f64] {
        &self.features.close_returns
    }

    pub fn mom_signal(&self) -> &[f64] {
        &self.features.mom_signal
    }

    pub fn column(&self, c: FeatureCol) -> &[f64] {
        match c {
            FeatureCol::Signal => &self.signal,
            FeatureCol::Commission => &self.commission,
            // Every non-annotation column is present on `FeatureColumns`.
            other => self.features.get(other).unwrap_or_default(),
        }
    }

    pub fn value(&self, c: FeatureCol, row: usize) -> Option<f64> {
        self.column(c).get(row).copied()
    }

    pub(crate) fn record(&mut self, row: usize, signal: f64, commission: f64) {
        self.signal[row] = signal;
        self.commission[row] = commission;
    }

    /// Per-row strategy factors `(close_returns + commission) * signal + 1`.
    pub fn strategy_factors(&self) -> impl Iterator<Item = f64> + '_ {
        self.close_returns()
            .iter()
            .zip(&self.commission)
            .zip(&self.signal)
            .map(|((&r, &c), &s)| strategy_factor(r, c, s))
    }

    /// The window as a polars frame: timestamp, master features, episode
    /// annotations, and the strategy and buy-and-hold equity curves.
    pub fn to_df(&self) -> GymResult<DataFrame> {
        let ts = self
            .timestamps
            .iter()
            .map(DateTime::timestamp_micros)
            .collect::<Vec<_>>();

        let model_equity = cumulative_product(self.strategy_factors());
        let hodl_equity = cumulative_product(self.close_returns().iter().map(|r| 1.0 + r));

        let mut columns: Vec<Column> = Vec::with_capacity(MASTER_COLS.len() + 5);
        columns.push(Series::new(SeriesCol::Timestamp.into(), ts).into_column());
        for c in MASTER_COLS
            .iter()
            .copied()
            .chain(FeatureCol::iter().filter(FeatureCol::is_episode_annotation))
        {
            columns.push(Series::new(c.into(), self.column(c)).into_column());
        }
        columns.push(Series::new(MODEL_EQUITY_COL.into(), model_equity).into_column());
        columns.push(Series::new(HODL_EQUITY_COL.into(), hodl_equity).into_column());

        DataFrame::new(columns)
            .and_then(|df| {
                df.lazy()
                    .with_column(col(SeriesCol::Timestamp).cast(DataType::Datetime(
                        TimeUnit::Microseconds,
                        Some(TimeZone::UTC),
                    )))
                    .collect()
            })
            .map_err(convert_err)
    }
}

fn convert_err(e: polars::error::PolarsError) -> GymError {
    polars_to_gym_error("episode frame", e)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};

    use super::*;
    use crate::data::{
        features::FeatureWindows,
        series::{PriceRecord, PriceSeries},
    };

    fn master(closes: &[f64]) -> MasterTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series = PriceSeries::from_records(closes.iter().enumerate().map(|(i, &close)| {
            PriceRecord {
                timestamp: start + Duration::hours(i as i64),
                close,
            }
        }))
        .unwrap();
        MasterTable::build(&series, FeatureWindows::default()).unwrap()
    }

    #[test]
    fn sample_copies_a_zero_annotated_slice() {
        let master = master(&[100.0, 101.0, 102.0, 99.0, 99.0, 100.0]);
        let window = EpisodeWindow::sample(&master, 1, 4).unwrap();

        assert_eq!(window.len(), 4);
        assert_eq!(window.start(), 1);
        assert_eq!(window.features().close, vec![101.0, 102.0, 99.0, 99.0]);
        assert_eq!(window.timestamps()[0], master.timestamps()[1]);
        assert!(window.signal().iter().all(|&s| s == 0.0));
        assert!(window.commission().iter().all(|&c| c == 0.0));
    }

    #[test]
    fn sample_out_of_range_fails() {
        let master = master(&[100.0, 101.0, 102.0]);
        let err = EpisodeWindow::sample(&master, 1, 3).unwrap_err();
        assert!(matches!(
            err,
            GymError::Env(EnvError::InvalidStart {
                start: 1,
                len: 3,
                rows: 3
            })
        ));
    }

    #[test]
    fn writes_stay_on_the_window() {
        let master = master(&[100.0, 101.0, 102.0, 99.0]);
        let mut window = EpisodeWindow::sample(&master, 0, 3).unwrap();
        window.record(1, 1.0, 0.0005);

        assert_eq!(window.value(FeatureCol::Signal, 1), Some(1.0));
        assert_eq!(window.value(FeatureCol::Commission, 1), Some(0.0005));
        assert_eq!(master.value(FeatureCol::Signal, 1), Some(0.0));

        let fresh = EpisodeWindow::sample(&master, 0, 3).unwrap();
        assert_eq!(fresh.value(FeatureCol::Signal, 1), Some(0.0));
    }

    #[test]
    fn frame_carries_annotations_and_equity_curves() {
        let master = master(&[100.0, 101.0, 102.0, 99.0]);
        let mut window = EpisodeWindow::sample(&master, 0, 3).unwrap();
        window.record(0, 1.0, 0.0);

        let df = window.to_df().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 1 + MASTER_COLS.len() + 4);

        let equity = df
            .column(MODEL_EQUITY_COL)
            .unwrap()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect::<Vec<_>>();
        assert!((equity[0] - 1.01).abs() < 1e-12);
        assert!((equity[2] - equity[0]).abs() < 1e-12);
    }
}
