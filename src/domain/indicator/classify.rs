//! Trend and risk-zone classification from EMA, RSI and MACD readings.

use crate::domain::indicator::Macd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskZone {
    Low,
    Medium,
    High,
}

/// Bullish iff close > ema50 > ema200, bearish iff close < ema50 < ema200.
pub fn classify_trend(close: f64, ema50: Option<f64>, ema200: Option<f64>) -> Trend {
    let (Some(ema50), Some(ema200)) = (ema50, ema200) else {
        return Trend::Neutral;
    };

    if close > ema50 && ema50 > ema200 {
        Trend::Bullish
    } else if close < ema50 && ema50 < ema200 {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// High when the trend is overextended with fading momentum, low when RSI is
/// mid-range and momentum agrees with the trend, medium otherwise.
pub fn classify_risk_zone(rsi: Option<f64>, macd: Option<Macd>, trend: Trend) -> RiskZone {
    let (Some(rsi), Some(macd)) = (rsi, macd) else {
        return RiskZone::Medium;
    };
    let histogram = macd.histogram;

    match trend {
        Trend::Bullish if rsi > 70.0 && histogram < 0.0 => return RiskZone::High,
        Trend::Bearish if rsi < 30.0 && histogram > 0.0 => return RiskZone::High,
        _ => {}
    }

    if rsi > 75.0 || rsi < 25.0 {
        return RiskZone::Medium;
    }

    if (40.0..=60.0).contains(&rsi) {
        match trend {
            Trend::Bullish if histogram > 0.0 => return RiskZone::Low,
            Trend::Bearish if histogram < 0.0 => return RiskZone::Low,
            _ => {}
        }
    }

    RiskZone::Medium
}
