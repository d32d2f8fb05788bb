use std::path::Path;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use polars::{
    df,
    prelude::{
        DataFrame, DataType, IntoLazy, LazyCsvReader, LazyFileListReader, NamedFrom, PlPath,
        TimeUnit, TimeZone, col,
    },
};
use serde::{Deserialize, Serialize};

use crate::{
    data::column::SeriesCol,
    error::{DataError, GymError, GymResult, IoError, polars_to_gym_error},
};

/// One bar of the raw input series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// A validated price series: non-empty, strictly increasing timestamps and
/// finite, positive close prices.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    timestamps: Vec<DateTime<Utc>>,
    close: Vec<f64>,
}

impl PriceSeries {
    /// Builds a series from records in any order. Records are sorted by timestamp;
    /// duplicate timestamps are rejected.
    pub fn from_records(records: impl IntoIterator<Item = PriceRecord>) -> GymResult<Self> {
        let mut records = records.into_iter().collect::<Vec<_>>();
        if records.is_empty() {
            return Err(DataError::EmptySeries.into());
        }
        records.sort_by_key(|r| r.timestamp);

        if let Some((a, _)) = records
            .iter()
            .tuple_windows()
            .find(|(a, b)| a.timestamp == b.timestamp)
        {
            return Err(DataError::DuplicateTimestamp(a.timestamp.to_rfc3339()).into());
        }

        for (row, r) in records.iter().enumerate() {
            if !r.close.is_finite() {
                return Err(invalid_close(row, "close must be finite"));
            }
            if r.close <= 0.0 {
                return Err(invalid_close(row, "close must be positive"));
            }
        }

        let (timestamps, close) = records.into_iter().map(|r| (r.timestamp, r.close)).unzip();
        Ok(Self { timestamps, close })
    }

    /// Reads a CSV file with a header row containing at least `timestamp` and `close`.
    ///
    /// Timestamps are parsed as dates when possible; integer timestamps are read
    /// as epoch microseconds.
    pub fn from_csv(path: impl AsRef<Path>) -> GymResult<Self> {
        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| {
            IoError::ReadFailed(format!("Invalid UTF-8 in path {}", path.display()))
        })?;

        let df = LazyCsvReader::new(PlPath::new(path_str))
            .with_has_header(true)
            .with_try_parse_dates(true)
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| IoError::ReadFailed(format!("{}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), rows = df.height(), "Loaded price series CSV");
        Self::try_from(&df)
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn records(&self) -> impl Iterator<Item = PriceRecord> + '_ {
        self.timestamps
            .iter()
            .zip(&self.close)
            .map(|(&timestamp, &close)| PriceRecord { timestamp, close })
    }

    /// Returns the series as a two-column frame (`timestamp` as UTC microseconds, `close`).
    pub fn to_df(&self) -> GymResult<DataFrame> {
        let ts = self
            .timestamps
            .iter()
            .map(DateTime::timestamp_micros)
            .collect::<Vec<_>>();

        df!(
            SeriesCol::Timestamp.as_str() => ts,
            SeriesCol::Close.as_str() => self.close.clone()
        )
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

impl TryFrom<&DataFrame> for PriceSeries {
    type Error = GymError;

    fn try_from(df: &DataFrame) -> GymResult<Self> {
        let ts_dtype = column_dtype(df, SeriesCol::Timestamp)?;
        let ts_expr = match ts_dtype {
            DataType::Datetime(_, _) | DataType::Date => col(SeriesCol::Timestamp)
                .dt()
                .timestamp(TimeUnit::Microseconds),
            dt if dt.is_integer() => col(SeriesCol::Timestamp).cast(DataType::Int64),
            other => return Err(unsupported(SeriesCol::Timestamp, &other)),
        };

        let close_dtype = column_dtype(df, SeriesCol::Close)?;
        if !(close_dtype.is_float() || close_dtype.is_integer()) {
            return Err(unsupported(SeriesCol::Close, &close_dtype));
        }

        let out = df
            .clone()
            .lazy()
            .select([
                ts_expr.alias(SeriesCol::Timestamp),
                col(SeriesCol::Close)
                    .cast(DataType::Float64)
                    .alias(SeriesCol::Close),
            ])
            .collect()
            .map_err(convert_err)?;

        let ts = out
            .column(SeriesCol::Timestamp.as_str())
            .and_then(|c| c.i64())
            .map_err(convert_err)?;
        let close = out
            .column(SeriesCol::Close.as_str())
            .and_then(|c| c.f64())
            .map_err(convert_err)?;

        let records = ts
            .into_iter()
            .zip(close)
            .enumerate()
            .map(|(row, (ts, close))| {
                let micros = ts.ok_or_else(|| invalid_timestamp(row, "timestamp is null"))?;
                let timestamp = DateTime::<Utc>::from_timestamp_micros(micros)
                    .ok_or_else(|| invalid_timestamp(row, "timestamp out of range"))?;
                let close = close.ok_or_else(|| invalid_close(row, "close is null"))?;
                Ok(PriceRecord { timestamp, close })
            })
            .collect::<GymResult<Vec<_>>>()?;

        Self::from_records(records)
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================
fn column_dtype(df: &DataFrame, c: SeriesCol) -> GymResult<DataType> {
    df.column(c.as_str())
        .map(|s| s.dtype().clone())
        .map_err(|_| DataError::MissingColumn(c.to_string()).into())
}

fn unsupported(c: SeriesCol, dtype: &DataType) -> GymError {
    DataError::UnsupportedDtype {
        column: c.to_string(),
        dtype: dtype.to_string(),
    }
    .into()
}

fn invalid_close(row: usize, msg: &str) -> GymError {
    DataError::InvalidClose {
        row,
        msg: msg.to_string(),
    }
    .into()
}

fn invalid_timestamp(row: usize, msg: &str) -> GymError {
    DataError::InvalidTimestamp {
        row,
        msg: msg.to_string(),
    }
    .into()
}

fn convert_err(e: polars::error::PolarsError) -> GymError {
    polars_to_gym_error("price series", e)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};

    use super::*;

    fn record(minute: i64, close: f64) -> PriceRecord {
        PriceRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute),
            close,
        }
    }

    #[test]
    fn records_are_sorted_by_timestamp() {
        let series =
            PriceSeries::from_records([record(2, 102.0), record(0, 100.0), record(1, 101.0)])
                .unwrap();
        assert_eq!(series.close(), &[100.0, 101.0, 102.0]);
        assert!(series.timestamps().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn rejects_duplicates_empty_and_bad_prices() {
        let dup = PriceSeries::from_records([record(0, 100.0), record(0, 101.0)]);
        assert!(matches!(
            dup,
            Err(GymError::Data(DataError::DuplicateTimestamp(_)))
        ));

        let empty = PriceSeries::from_records(Vec::new());
        assert!(matches!(empty, Err(GymError::Data(DataError::EmptySeries))));

        let nan = PriceSeries::from_records([record(0, 100.0), record(1, f64::NAN)]);
        assert!(matches!(
            nan,
            Err(GymError::Data(DataError::InvalidClose { row: 1, .. }))
        ));

        let zero = PriceSeries::from_records([record(0, 0.0)]);
        assert!(matches!(
            zero,
            Err(GymError::Data(DataError::InvalidClose { row: 0, .. }))
        ));
    }

    #[test]
    fn data_frame_round_trip_keeps_timestamps() {
        let series =
            PriceSeries::from_records([record(0, 100.0), record(1, 101.0), record(2, 99.5)])
                .unwrap();
        let df = series.to_df().unwrap();
        assert_eq!(df.height(), 3);

        let back = PriceSeries::try_from(&df).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn integer_timestamps_are_epoch_micros() {
        let df = df!(
            "timestamp" => [2_000_000i64, 1_000_000],
            "close" => [11i64, 10]
        )
        .unwrap();
        let series = PriceSeries::try_from(&df).unwrap();
        assert_eq!(series.close(), &[10.0, 11.0]);
        assert_eq!(series.timestamps()[0].timestamp(), 1);
    }

    #[test]
    fn missing_close_column_is_reported() {
        let df = df!("timestamp" => [1i64, 2]).unwrap();
        let err = PriceSeries::try_from(&df).unwrap_err();
        assert!(matches!(err, GymError::Data(DataError::MissingColumn(c)) if c == "close"));
    }
}
