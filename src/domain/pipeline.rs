//! Indicator pipeline: bar window in, parallel enriched series out.
//!
//! Every call recomputes all series over the whole window; no state is carried
//! between calls, so the output for a given window is always the same.

use crate::domain::indicator::classify::{classify_risk_zone, classify_trend, RiskZone, Trend};
use crate::domain::indicator::cross::{detect_cross, CrossSignal};
use crate::domain::indicator::order_block::{active_order_blocks, OrderBlock};
use crate::domain::indicator::sideways::{is_sideways, DEFAULT_LOOKBACK as SIDEWAYS_LOOKBACK};
use crate::domain::indicator::volume::{volume_trend, VolumeTrend, DEFAULT_PERIOD as VOLUME_PERIOD};
use crate::domain::indicator::atr::DEFAULT_PERIOD as ATR_PERIOD;
use crate::domain::indicator::rsi::DEFAULT_PERIOD as RSI_PERIOD;
use crate::domain::indicator::{
    calculate_atr, calculate_average_volume, calculate_ema, calculate_macd_default,
    calculate_rsi, Macd,
};
use crate::domain::ohlcv::Bar;

pub const FAST_EMA: usize = 50;
pub const SLOW_EMA: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Indicators {
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    pub atr: Option<f64>,
    pub trend: Trend,
    pub risk_zone: RiskZone,
    pub cross: CrossSignal,
    pub volume_trend: VolumeTrend,
    pub volume_ratio: f64,
    pub is_sideways: bool,
    pub active_demand_block: Option<OrderBlock>,
    pub active_supply_block: Option<OrderBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedBar {
    pub bar: Bar,
    pub indicators: Indicators,
}

pub fn enrich(bars: &[Bar]) -> Vec<EnrichedBar> {
    let ema50 = calculate_ema(bars, FAST_EMA);
    let ema200 = calculate_ema(bars, SLOW_EMA);
    let rsi = calculate_rsi(bars, RSI_PERIOD);
    let macd = calculate_macd_default(bars);
    let atr = calculate_atr(bars, ATR_PERIOD);
    let avg_volume = calculate_average_volume(bars, VOLUME_PERIOD);
    let blocks = active_order_blocks(bars, &atr.values);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let trend = classify_trend(bar.close, ema50.value_at(i), ema200.value_at(i));
            let risk_zone = classify_risk_zone(rsi.value_at(i), macd.value_at(i), trend);
            let (volume_trend, volume_ratio) = volume_trend(bars, i, avg_volume.value_at(i));

            EnrichedBar {
                bar: bar.clone(),
                indicators: Indicators {
                    ema50: ema50.value_at(i),
                    ema200: ema200.value_at(i),
                    rsi: rsi.value_at(i),
                    macd: macd.value_at(i),
                    atr: atr.value_at(i),
                    trend,
                    risk_zone,
                    cross: detect_cross(&ema50.values, &ema200.values, i),
                    volume_trend,
                    volume_ratio,
                    is_sideways: is_sideways(bars, i, SIDEWAYS_LOOKBACK),
                    active_demand_block: blocks[i].demand,
                    active_supply_block: blocks[i].supply,
                },
            }
        })
        .collect()
}
