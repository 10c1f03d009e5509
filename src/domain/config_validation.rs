//! Configuration validation.
//!
//! Validates the `[dcf]` and `[discount]` sections before any valuation runs.

use crate::domain::capital::DiscountMethod;
use crate::domain::error::FairvalError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_HORIZON_YEARS: i64 = 10;
pub const MAX_HORIZON_YEARS: i64 = 50;
pub const DEFAULT_GROWTH_PHASE1: f64 = 0.10;
pub const DEFAULT_GROWTH_PHASE2: f64 = 0.06;
pub const DEFAULT_TERMINAL_GROWTH: f64 = 0.04;
pub const DEFAULT_MANUAL_RATE: f64 = 0.12;

pub fn validate_dcf_config(config: &dyn ConfigPort) -> Result<(), FairvalError> {
    validate_horizon(config)?;
    validate_growth(config, "growth_phase1", DEFAULT_GROWTH_PHASE1)?;
    validate_growth(config, "growth_phase2", DEFAULT_GROWTH_PHASE2)?;
    validate_growth(config, "terminal_growth", DEFAULT_TERMINAL_GROWTH)?;
    Ok(())
}

pub fn validate_discount_config(config: &dyn ConfigPort) -> Result<(), FairvalError> {
    match discount_method(config)? {
        DiscountMethod::Manual => validate_manual_rate(config),
        DiscountMethod::Capm | DiscountMethod::Auto => validate_capm_ranges(config),
    }
}

/// `[company]` keys that override or stand in for sourced fundamentals.
pub const COMPANY_KEYS: [&str; 4] = ["base_cash_flow", "net_debt", "share_count", "current_price"];

/// Every `[company]` value that is present must parse as a number.
pub fn validate_company_config(config: &dyn ConfigPort) -> Result<(), FairvalError> {
    for key in COMPANY_KEYS {
        strict_double(config, "company", key, 0.0)?;
    }
    Ok(())
}

pub fn discount_method(config: &dyn ConfigPort) -> Result<DiscountMethod, FairvalError> {
    match config.get_string("discount", "method") {
        None => Ok(DiscountMethod::Manual),
        Some(s) => s.parse().map_err(|reason| FairvalError::ConfigInvalid {
            section: "discount".to_string(),
            key: "method".to_string(),
            reason,
        }),
    }
}

/// Read a numeric key, rejecting values that are present but unparseable.
fn strict_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, FairvalError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => config
            .get_opt_double(section, key)
            .filter(|v| v.is_finite())
            .ok_or_else(|| FairvalError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("{:?} is not a number", raw),
            }),
    }
}

fn validate_horizon(config: &dyn ConfigPort) -> Result<(), FairvalError> {
    if let Some(raw) = config.get_string("dcf", "horizon_years") {
        if raw.trim().parse::<i64>().is_err() {
            return Err(FairvalError::ConfigInvalid {
                section: "dcf".to_string(),
                key: "horizon_years".to_string(),
                reason: format!("{:?} is not a whole number of years", raw),
            });
        }
    }
    let value = config.get_int("dcf", "horizon_years", DEFAULT_HORIZON_YEARS);
    if !(1..=MAX_HORIZON_YEARS).contains(&value) {
        return Err(FairvalError::ConfigInvalid {
            section: "dcf".to_string(),
            key: "horizon_years".to_string(),
            reason: format!("horizon_years must be between 1 and {}", MAX_HORIZON_YEARS),
        });
    }
    Ok(())
}

fn validate_growth(config: &dyn ConfigPort, key: &str, default: f64) -> Result<(), FairvalError> {
    let value = strict_double(config, "dcf", key, default)?;
    if value <= -1.0 {
        return Err(FairvalError::ConfigInvalid {
            section: "dcf".to_string(),
            key: key.to_string(),
            reason: format!("{} must be greater than -1", key),
        });
    }
    Ok(())
}

fn validate_manual_rate(config: &dyn ConfigPort) -> Result<(), FairvalError> {
    let rate = strict_double(config, "discount", "rate", DEFAULT_MANUAL_RATE)?;
    if rate <= 0.0 {
        return Err(FairvalError::ConfigInvalid {
            section: "discount".to_string(),
            key: "rate".to_string(),
            reason: "rate must be positive".to_string(),
        });
    }
    let terminal = strict_double(config, "dcf", "terminal_growth", DEFAULT_TERMINAL_GROWTH)?;
    if terminal >= rate {
        return Err(FairvalError::ConfigInvalid {
            section: "dcf".to_string(),
            key: "terminal_growth".to_string(),
            reason: "terminal_growth must be less than the discount rate".to_string(),
        });
    }
    Ok(())
}

fn validate_capm_ranges(config: &dyn ConfigPort) -> Result<(), FairvalError> {
    let non_negative = ["beta", "equity_risk_premium", "cost_of_debt"];
    for key in non_negative {
        if strict_double(config, "discount", key, 0.0)? < 0.0 {
            return Err(FairvalError::ConfigInvalid {
                section: "discount".to_string(),
                key: key.to_string(),
                reason: format!("{} must be non-negative", key),
            });
        }
    }

    strict_double(config, "discount", "risk_free_rate", 0.0)?;

    let tax = strict_double(config, "discount", "tax_rate", 0.0)?;
    if !(0.0..1.0).contains(&tax) {
        return Err(FairvalError::ConfigInvalid {
            section: "discount".to_string(),
            key: "tax_rate".to_string(),
            reason: "tax_rate must be at least 0 and below 1".to_string(),
        });
    }

    let weight = strict_double(config, "discount", "equity_weight", 0.0)?;
    if !(0.0..=1.0).contains(&weight) {
        return Err(FairvalError::ConfigInvalid {
            section: "discount".to_string(),
            key: "equity_weight".to_string(),
            reason: "equity_weight must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}
