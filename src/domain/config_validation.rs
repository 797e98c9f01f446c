//! Configuration validation.
//!
//! Checks ranges and names before a replay is built, so the core only ever
//! sees sane values.

use crate::domain::error::ReplayError;
use crate::domain::strategy::{StrategyVariant, MIN_HISTORY};
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_replay_config(config)?;
    validate_risk_config(config)?;
    validate_strategy_config(config)?;
    validate_data_config(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> ReplayError {
    ReplayError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn in_open_unit(value: f64) -> bool {
    value > 0.0 && value < 1.0
}

pub fn validate_replay_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if config.get_double("replay", "initial_balance", 10_000.0) <= 0.0 {
        return Err(invalid("replay", "initial_balance", "initial_balance must be positive"));
    }

    if config.get_int("replay", "window_cap", 2000) < MIN_HISTORY as i64 {
        return Err(invalid(
            "replay",
            "window_cap",
            &format!("window_cap must be at least {}", MIN_HISTORY),
        ));
    }

    if config.get_int("replay", "recalibration_interval", 100) < 0 {
        return Err(invalid(
            "replay",
            "recalibration_interval",
            "recalibration_interval must be non-negative",
        ));
    }

    if config.get_int("replay", "recalibration_lookback", 500) <= 0 {
        return Err(invalid(
            "replay",
            "recalibration_lookback",
            "recalibration_lookback must be positive",
        ));
    }

    if !in_open_unit(config.get_double("replay", "history_fraction", 0.15)) {
        return Err(invalid(
            "replay",
            "history_fraction",
            "history_fraction must be between 0 and 1",
        ));
    }

    if config.get_int("replay", "max_history", 1000) < 0 {
        return Err(invalid("replay", "max_history", "max_history must be non-negative"));
    }

    if config.get_int("replay", "tick_interval_ms", 0) < 0 {
        return Err(invalid(
            "replay",
            "tick_interval_ms",
            "tick_interval_ms must be non-negative",
        ));
    }

    if config.get_string("replay", "max_ticks").is_some()
        && config.get_int("replay", "max_ticks", 0) <= 0
    {
        return Err(invalid("replay", "max_ticks", "max_ticks must be a positive integer"));
    }

    if config.get_double("replay", "commission_pct", 0.0) < 0.0 {
        return Err(invalid(
            "replay",
            "commission_pct",
            "commission_pct must be non-negative",
        ));
    }

    Ok(())
}

pub fn validate_risk_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if !in_open_unit(config.get_double("risk", "risk_per_trade", 0.015)) {
        return Err(invalid("risk", "risk_per_trade", "risk_per_trade must be between 0 and 1"));
    }

    if config.get_double("risk", "min_position", 10.0) < 0.0 {
        return Err(invalid("risk", "min_position", "min_position must be non-negative"));
    }

    let max_position = config.get_double("risk", "max_position_fraction", 0.95);
    if max_position <= 0.0 || max_position > 1.0 {
        return Err(invalid(
            "risk",
            "max_position_fraction",
            "max_position_fraction must be in (0, 1]",
        ));
    }

    if !in_open_unit(config.get_double("risk", "max_risk_fraction", 0.1)) {
        return Err(invalid(
            "risk",
            "max_risk_fraction",
            "max_risk_fraction must be between 0 and 1",
        ));
    }

    if config.get_double("risk", "atr_stop_multiplier", 1.5) <= 0.0 {
        return Err(invalid(
            "risk",
            "atr_stop_multiplier",
            "atr_stop_multiplier must be positive",
        ));
    }

    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    if let Some(name) = config.get_string("strategy", "variant") {
        if name.parse::<StrategyVariant>().is_err() {
            return Err(invalid(
                "strategy",
                "variant",
                &format!(
                    "unknown variant '{}', expected one of: {}",
                    name,
                    StrategyVariant::NAMES.join(", ")
                ),
            ));
        }
    }

    if config.get_double("strategy", "risk_reward_ratio", 3.0) <= 0.0 {
        return Err(invalid(
            "strategy",
            "risk_reward_ratio",
            "risk_reward_ratio must be positive",
        ));
    }
    if config.get_double("strategy", "fixed_ratio", 2.5) <= 0.0 {
        return Err(invalid("strategy", "fixed_ratio", "fixed_ratio must be positive"));
    }

    let optimizer = config
        .get_string("strategy", "optimizer")
        .unwrap_or_else(|| "fixed".to_string());
    match optimizer.trim().to_ascii_lowercase().as_str() {
        "fixed" => {}
        "sweep" => {
            parse_ratio_list(config.get_string("strategy", "sweep_ratios").as_deref())?;
        }
        other => {
            return Err(invalid(
                "strategy",
                "optimizer",
                &format!("unknown optimizer '{}', expected fixed or sweep", other),
            ));
        }
    }

    Ok(())
}

/// Comma-separated positive ratios. Missing or empty is an error.
pub fn parse_ratio_list(value: Option<&str>) -> Result<Vec<f64>, ReplayError> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Err(ReplayError::ConfigMissing {
            section: "strategy".to_string(),
            key: "sweep_ratios".to_string(),
        });
    };

    value
        .split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<f64>() {
                Ok(r) if r > 0.0 && r.is_finite() => Ok(r),
                _ => Err(invalid(
                    "strategy",
                    "sweep_ratios",
                    &format!("'{}' is not a positive number", part),
                )),
            }
        })
        .collect()
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.trim().to_ascii_lowercase().as_str() {
        "csv" => {}
        "synthetic" => {
            if config.get_int("data", "bars", 2000) <= 0 {
                return Err(invalid("data", "bars", "bars must be positive"));
            }
        }
        other => {
            return Err(invalid(
                "data",
                "source",
                &format!("unknown source '{}', expected csv or synthetic", other),
            ));
        }
    }

    Ok(())
}
