//! CSV file bar source.
//!
//! Expects a header row `time,open,high,low,close,volume`. `time` is either
//! epoch milliseconds or `%Y-%m-%d %H:%M:%S` (a bare `%Y-%m-%d` means
//! midnight).

use std::fs::File;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::Deserialize;

use crate::domain::error::ReplayError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::BarSource;

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvAdapter {
    path: PathBuf,
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl BarSource for CsvAdapter {
    fn fetch_bars(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Bar>, ReplayError> {
        let file = File::open(&self.path).map_err(|e| ReplayError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);
        let mut bars = Vec::new();

        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.map_err(|e| ReplayError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let time = parse_time(&row.time).ok_or_else(|| ReplayError::Data {
                reason: format!("invalid time '{}' on data row {}", row.time, line + 1),
            })?;

            bars.push(Bar {
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        if bars.is_empty() {
            return Err(ReplayError::NoData {
                symbol: symbol.to_string(),
            });
        }

        if bars.windows(2).any(|w| w[1].time < w[0].time) {
            warn!("{}: bars out of order, sorting by time", self.path.display());
            bars.sort_by_key(|b| b.time);
        }

        let skip = bars.len().saturating_sub(limit);
        let bars: Vec<Bar> = bars.into_iter().skip(skip).collect();
        debug!(
            "loaded {} {} bars for {} from {}",
            bars.len(),
            interval,
            symbol,
            self.path.display()
        );
        Ok(bars)
    }
}
