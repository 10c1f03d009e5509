//! Cost-of-capital model: CAPM cost of equity and WACC blending.
//!
//! [`estimate_wacc`] is the best-effort path driven by whatever statement
//! figures are available. Every default it substitutes is recorded as a
//! [`Fallback`] so callers can tell a degraded estimate from a full one.

use crate::domain::error::FairvalError;
use crate::domain::fundamentals::StatementFigures;
use std::fmt;

/// How the discount rate is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountMethod {
    Manual,
    Capm,
    Auto,
}

impl std::str::FromStr for DiscountMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(DiscountMethod::Manual),
            "capm" => Ok(DiscountMethod::Capm),
            "auto" => Ok(DiscountMethod::Auto),
            other => Err(format!(
                "unknown discount method {:?} (expected manual, capm or auto)",
                other
            )),
        }
    }
}

/// `rf + beta * erp`
pub fn cost_of_equity(risk_free_rate: f64, beta: f64, equity_risk_premium: f64) -> f64 {
    risk_free_rate + beta * equity_risk_premium
}

/// Inputs for a CAPM-based weighted average cost of capital.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapmInputs {
    pub risk_free_rate: f64,
    pub beta: f64,
    pub equity_risk_premium: f64,
    pub pre_tax_cost_of_debt: f64,
    pub tax_rate: f64,
    pub equity_weight: f64,
}

impl CapmInputs {
    pub fn validate(&self) -> Result<(), FairvalError> {
        let fields = [
            ("risk_free_rate", self.risk_free_rate),
            ("beta", self.beta),
            ("equity_risk_premium", self.equity_risk_premium),
            ("pre_tax_cost_of_debt", self.pre_tax_cost_of_debt),
            ("tax_rate", self.tax_rate),
            ("equity_weight", self.equity_weight),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(FairvalError::invalid(field, "must be a finite number"));
            }
        }
        if !(0.0..=1.0).contains(&self.equity_weight) {
            return Err(FairvalError::invalid(
                "equity_weight",
                "must be between 0 and 1",
            ));
        }
        if !(0.0..1.0).contains(&self.tax_rate) {
            return Err(FairvalError::invalid(
                "tax_rate",
                "must be at least 0 and below 1",
            ));
        }
        Ok(())
    }

    pub fn debt_weight(&self) -> f64 {
        1.0 - self.equity_weight
    }

    pub fn cost_of_equity(&self) -> f64 {
        cost_of_equity(self.risk_free_rate, self.beta, self.equity_risk_premium)
    }

    pub fn after_tax_cost_of_debt(&self) -> f64 {
        self.pre_tax_cost_of_debt * (1.0 - self.tax_rate)
    }

    pub fn wacc(&self) -> f64 {
        self.equity_weight * self.cost_of_equity()
            + self.debt_weight() * self.after_tax_cost_of_debt()
    }
}

/// Values substituted when statement figures are unavailable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaccDefaults {
    pub risk_free_rate: f64,
    pub beta: f64,
    pub equity_risk_premium: f64,
    pub pre_tax_cost_of_debt: f64,
    pub tax_rate: f64,
    pub equity_weight: f64,
}

impl Default for WaccDefaults {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.072,
            beta: 1.0,
            equity_risk_premium: 0.06,
            pre_tax_cost_of_debt: 0.085,
            tax_rate: 0.25,
            equity_weight: 0.8,
        }
    }
}

/// An input the best-effort estimate had to default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fallback {
    RiskFreeRate,
    Beta,
    CostOfDebt,
    CapitalWeights,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::RiskFreeRate => write!(f, "risk-free rate"),
            Fallback::Beta => write!(f, "beta"),
            Fallback::CostOfDebt => write!(f, "cost of debt"),
            Fallback::CapitalWeights => write!(f, "capital weights"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaccEstimate {
    pub wacc: f64,
    pub breakdown: CapmInputs,
    pub fallbacks: Vec<Fallback>,
}

impl WaccEstimate {
    pub fn is_low_confidence(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

pub fn estimate_wacc(figures: &StatementFigures, defaults: &WaccDefaults) -> WaccEstimate {
    let mut fallbacks = Vec::new();

    let risk_free_rate = match figures.risk_free_rate.filter(|v| v.is_finite()) {
        Some(rf) => rf,
        None => {
            fallbacks.push(Fallback::RiskFreeRate);
            defaults.risk_free_rate
        }
    };

    let beta = match figures.beta.filter(|v| v.is_finite()) {
        Some(b) => b,
        None => {
            fallbacks.push(Fallback::Beta);
            defaults.beta
        }
    };

    let debt = figures.total_debt.filter(|d| d.is_finite());

    let pre_tax_cost_of_debt = match (figures.interest_expense, debt) {
        (Some(interest), Some(d)) if interest.is_finite() && interest != 0.0 && d > 0.0 => {
            interest.abs() / d
        }
        _ => {
            fallbacks.push(Fallback::CostOfDebt);
            defaults.pre_tax_cost_of_debt
        }
    };

    let equity_weight = match (figures.market_cap, debt) {
        // zero debt is an all-equity structure; negative figures are unusable
        (Some(mcap), Some(d)) if mcap.is_finite() && mcap > 0.0 && d >= 0.0 => {
            mcap / (mcap + d)
        }
        _ => {
            fallbacks.push(Fallback::CapitalWeights);
            defaults.equity_weight
        }
    };

    let breakdown = CapmInputs {
        risk_free_rate,
        beta,
        equity_risk_premium: defaults.equity_risk_premium,
        pre_tax_cost_of_debt,
        tax_rate: defaults.tax_rate,
        equity_weight,
    };

    WaccEstimate {
        wacc: breakdown.wacc(),
        breakdown,
        fallbacks,
    }
}
