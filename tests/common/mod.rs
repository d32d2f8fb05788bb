#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use single_stock_gym::prelude::*;

pub const SHORT: usize = 0;
pub const FLAT: usize = 1;
pub const LONG: usize = 2;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn load_fixture_series() -> Result<PriceSeries> {
    let path = fixture_path("prices.csv");
    PriceSeries::from_csv(&path).with_context(|| format!("loading {}", path.display()))
}

/// Hourly series starting 2024-01-01 with the given closes.
pub fn series_from_closes(closes: &[f64]) -> Result<PriceSeries> {
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .context("valid start timestamp")?;
    let series = PriceSeries::from_records(closes.iter().enumerate().map(|(i, &close)| {
        PriceRecord {
            timestamp: start + Duration::hours(i as i64),
            close,
        }
    }))?;
    Ok(series)
}

/// Deterministic action sequence cycling through every transition.
pub fn scripted_actions(n: usize) -> Vec<usize> {
    [FLAT, LONG, LONG, SHORT, SHORT, FLAT, SHORT, LONG, FLAT, FLAT]
        .into_iter()
        .cycle()
        .take(n)
        .collect()
}
