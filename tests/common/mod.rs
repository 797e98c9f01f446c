#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use replaytrader::domain::error::ReplayError;
use replaytrader::domain::indicator::classify::{RiskZone, Trend};
use replaytrader::domain::indicator::cross::CrossSignal;
use replaytrader::domain::indicator::volume::VolumeTrend;
pub use replaytrader::domain::ohlcv::Bar;
use replaytrader::domain::pipeline::{EnrichedBar, Indicators};
use replaytrader::ports::data_port::BarSource;
use std::collections::HashMap;

pub struct MockBarSource {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockBarSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl BarSource for MockBarSource {
    fn fetch_bars(&self, symbol: &str, _interval: &str, limit: usize) -> Result<Vec<Bar>, ReplayError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(ReplayError::Data {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(symbol).cloned().unwrap_or_default();
        if bars.is_empty() {
            return Err(ReplayError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let skip = bars.len().saturating_sub(limit);
        Ok(bars.into_iter().skip(skip).collect())
    }
}

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

/// Bars with a one-unit range around each close, opening at the prior close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = if i == 0 { c } else { closes[i - 1] };
            make_bar(i, open, open.max(c) + 0.5, open.min(c) - 0.5, c)
        })
        .collect()
}

/// Slow uptrend with a wave on top, long enough for every indicator.
pub fn wave_bars(count: usize) -> Vec<Bar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| 100.0 + (i as f64 / 7.0).sin() * 4.0 + i as f64 * 0.03)
        .collect();
    bars_from_closes(&closes)
}

pub fn neutral_indicators() -> Indicators {
    Indicators {
        ema50: None,
        ema200: None,
        rsi: None,
        macd: None,
        atr: None,
        trend: Trend::Neutral,
        risk_zone: RiskZone::Medium,
        cross: CrossSignal::NONE,
        volume_trend: VolumeTrend::Neutral,
        volume_ratio: 1.0,
        is_sideways: false,
        active_demand_block: None,
        active_supply_block: None,
    }
}

pub fn enriched(index: usize, close: f64, indicators: Indicators) -> EnrichedBar {
    EnrichedBar {
        bar: make_bar(index, close, close + 0.5, close - 0.5, close),
        indicators,
    }
}

pub fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("time,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.time.format("%Y-%m-%d %H:%M:%S"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
