//! Deterministic synthetic bar source for offline runs.
//!
//! Price follows a drift that flips direction every 500 bars, a sine wave with
//! a ~63 bar period and seeded uniform noise. The same seed always produces
//! the same series.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::error::ReplayError;
use crate::domain::ohlcv::Bar;
use crate::ports::data_port::BarSource;

const START_PRICE: f64 = 3000.0;
const TREND_PHASE: usize = 500;
const TREND_STEP: f64 = 2.0;
const WAVE_AMPLITUDE: f64 = 15.0;
const WAVE_PERIOD: f64 = 10.0;
const NOISE: f64 = 10.0;

pub struct SyntheticAdapter {
    seed: u64,
    start: NaiveDateTime,
}

impl SyntheticAdapter {
    pub fn new(seed: u64) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self { seed, start }
    }

    pub fn generate(&self, count: usize, step: Duration) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut bars = Vec::with_capacity(count);
        let mut price = START_PRICE;
        let mut direction = 1.0;
        let mut time = self.start;

        for i in 0..count {
            if i % TREND_PHASE == 0 {
                direction = -direction;
            }
            let wave = (i as f64 / WAVE_PERIOD).sin() * WAVE_AMPLITUDE;
            let noise = rng.gen_range(-0.5..0.5) * NOISE;

            let open = price;
            let close = (price + direction * TREND_STEP + wave + noise).max(1.0);
            let wick = (noise * 2.0).abs();

            bars.push(Bar {
                time,
                open,
                high: open.max(close) + wick,
                low: (open.min(close) - wick).max(0.5),
                close,
                volume: rng.gen_range(500.0..1500.0),
            });

            price = close;
            time += step;
        }

        bars
    }
}

/// Bar spacing for intervals like `15m`, `1h`, `4h`, `1d`, `1w`.
pub fn interval_duration(interval: &str) -> Option<Duration> {
    let interval = interval.trim();
    let split = interval.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = interval.split_at(split);
    let amount: i64 = amount.parse().ok().filter(|&n| n > 0)?;

    match unit {
        "m" => Some(Duration::minutes(amount)),
        "h" => Some(Duration::hours(amount)),
        "d" => Some(Duration::days(amount)),
        "w" => Some(Duration::weeks(amount)),
        _ => None,
    }
}

impl BarSource for SyntheticAdapter {
    fn fetch_bars(&self, symbol: &str, interval: &str, limit: usize) -> Result<Vec<Bar>, ReplayError> {
        let step = interval_duration(interval).ok_or_else(|| ReplayError::Data {
            reason: format!("unsupported interval '{}' for {}", interval, symbol),
        })?;
        if limit == 0 {
            return Err(ReplayError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(self.generate(limit, step))
    }
}
