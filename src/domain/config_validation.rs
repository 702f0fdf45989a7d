//! Configuration validation.
//!
//! Hard failures reject the run before any simulation happens. Values that
//! are legal but probably not what the user meant are returned as warnings.

use rust_decimal::Decimal;
use std::fmt;

use crate::domain::error::RoundtripError;
use crate::domain::simulation::AnalysisConfig;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// `commission_pct` is divided by 100 once more inside the commission
    /// formula. A value below 1 therefore charges less than 0.01% of
    /// notional, which usually means a fraction was entered as a percent.
    DoubleScaledPercentage {
        configured: Decimal,
        effective_rate: Decimal,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::DoubleScaledPercentage {
                configured,
                effective_rate,
            } => write!(
                f,
                "commission_pct = {configured} is divided by 100 again when charging; \
                 the effective rate is {effective_rate} of notional ({}%)",
                effective_rate * Decimal::ONE_HUNDRED
            ),
        }
    }
}

pub fn validate_analysis_config(
    config: &AnalysisConfig,
) -> Result<Vec<ConfigWarning>, RoundtripError> {
    validate_starting_cash(config)?;
    validate_commission(config)?;
    validate_window(config)?;
    validate_reference_times(config)?;

    let mut warnings = Vec::new();
    let pct = config.commission.percentage;
    if !pct.is_zero() && pct < Decimal::ONE {
        warnings.push(ConfigWarning::DoubleScaledPercentage {
            configured: pct,
            effective_rate: config.commission.effective_rate(),
        });
    }
    Ok(warnings)
}

fn validate_starting_cash(config: &AnalysisConfig) -> Result<(), RoundtripError> {
    if config.starting_cash <= Decimal::ZERO {
        return Err(RoundtripError::invalid(
            "analysis",
            "starting_cash",
            "starting_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &AnalysisConfig) -> Result<(), RoundtripError> {
    if config.commission.floor < Decimal::ZERO {
        return Err(RoundtripError::invalid(
            "analysis",
            "commission_floor",
            "commission_floor must be non-negative",
        ));
    }
    if config.commission.percentage < Decimal::ZERO {
        return Err(RoundtripError::invalid(
            "analysis",
            "commission_pct",
            "commission_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_window(config: &AnalysisConfig) -> Result<(), RoundtripError> {
    if config.window <= chrono::Duration::zero() {
        return Err(RoundtripError::invalid(
            "analysis",
            "window_days",
            "window_days must be positive",
        ));
    }
    Ok(())
}

fn validate_reference_times(config: &AnalysisConfig) -> Result<(), RoundtripError> {
    if config.sell_time >= config.buy_time {
        return Err(RoundtripError::invalid(
            "analysis",
            "sell_time",
            "sell_time must be earlier than buy_time",
        ));
    }
    Ok(())
}

/// Check the `[data]` section names a usable store.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), RoundtripError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.trim().to_lowercase().as_str() {
        "csv" => match config.get_string("data", "csv_dir") {
            Some(dir) if !dir.trim().is_empty() => Ok(()),
            _ => Err(RoundtripError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            }),
        },
        "sqlite" => match config.get_string("sqlite", "path") {
            Some(path) if !path.trim().is_empty() => Ok(()),
            _ => Err(RoundtripError::ConfigMissing {
                section: "sqlite".to_string(),
                key: "path".to_string(),
            }),
        },
        other => Err(RoundtripError::invalid(
            "data",
            "source",
            format!("unknown data source '{other}', expected csv or sqlite"),
        )),
    }
}
