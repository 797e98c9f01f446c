//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod pipeline;
pub mod signal;
pub mod strategy;
pub mod position;
pub mod execution;
pub mod portfolio;
pub mod optimizer;
pub mod backtest;
pub mod runner;
pub mod metrics;
pub mod config_validation;
pub mod error;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::ohlcv::Bar;

    pub fn bar_time(index: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(index as i64)
    }

    pub fn make_bar(index: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            time: bar_time(index),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| make_bar(i, close, close, close, close))
            .collect()
    }

    pub fn bars_from_volumes(volumes: &[f64]) -> Vec<Bar> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &volume)| Bar {
                volume,
                ..make_bar(i, 100.0, 100.0, 100.0, 100.0)
            })
            .collect()
    }
}
