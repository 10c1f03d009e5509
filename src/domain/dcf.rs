//! Two-stage discounted-cash-flow valuation engine.
//!
//! [`run_dcf`] is a pure function: it validates its inputs, projects cash
//! flows across two growth phases, discounts them, adds a Gordon-growth
//! terminal value and converts the result to a per-share fair value.
//! Nothing is rounded here; see [`ValuationResult::summary`].

use crate::domain::error::FairvalError;
use serde::Serialize;

/// Inputs to a single valuation run.
#[derive(Debug, Clone, PartialEq)]
pub struct DcfInputs {
    pub base_cash_flow: f64,
    pub net_debt: f64,
    pub share_count: f64,
    pub discount_rate: f64,
    pub horizon_length: usize,
    pub growth_rate_phase1: f64,
    pub growth_rate_phase2: f64,
    pub terminal_growth_rate: f64,
}

/// One explicit period of the projection table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionRow {
    pub period: usize,
    pub cash_flow: f64,
    pub discount_factor: f64,
    pub present_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValuationComponents {
    pub pv_cash_flows: f64,
    pub terminal_value: f64,
    pub present_terminal_value: f64,
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub fair_value_per_share: f64,
}

/// Echo of the assumptions a result was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assumptions {
    pub base_cash_flow: f64,
    pub net_debt: f64,
    pub share_count: f64,
    pub discount_rate: f64,
    pub horizon_length: usize,
    pub phase1_length: usize,
    pub phase2_length: usize,
    pub growth_rate_phase1: f64,
    pub growth_rate_phase2: f64,
    pub terminal_growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuationResult {
    pub projections: Vec<ProjectionRow>,
    pub components: ValuationComponents,
    pub assumptions: Assumptions,
}

/// Display-precision view of a result, rounded to two decimal places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub fair_value_per_share: f64,
}

impl ValuationResult {
    pub fn fair_value_per_share(&self) -> f64 {
        self.components.fair_value_per_share
    }

    pub fn summary(&self) -> Summary {
        Summary {
            enterprise_value: round2(self.components.enterprise_value),
            equity_value: round2(self.components.equity_value),
            fair_value_per_share: round2(self.components.fair_value_per_share),
        }
    }

    /// Relative upside of fair value over `current_price`.
    ///
    /// `None` unless the price is known, finite and positive.
    pub fn upside(&self, current_price: Option<f64>) -> Option<f64> {
        let price = current_price.filter(|p| p.is_finite() && *p > 0.0)?;
        Some((self.components.fair_value_per_share - price) / price)
    }

    /// Fraction of enterprise value contributed by the discounted terminal value.
    pub fn terminal_share(&self) -> f64 {
        let ev = self.components.enterprise_value;
        if ev != 0.0 {
            self.components.present_terminal_value / ev
        } else {
            0.0
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Split a horizon into (phase 1, phase 2) lengths. Phase 2 takes the odd period.
pub fn phase_split(horizon_length: usize) -> (usize, usize) {
    let phase1 = horizon_length / 2;
    (phase1, horizon_length - phase1)
}

pub fn run_dcf(inputs: &DcfInputs) -> Result<ValuationResult, FairvalError> {
    validate(inputs)?;

    let n = inputs.horizon_length;
    let (phase1_length, phase2_length) = phase_split(n);
    let r = inputs.discount_rate;

    let mut projections = Vec::with_capacity(n);
    let mut level = inputs.base_cash_flow;
    for period in 1..=n {
        let growth = if period <= phase1_length {
            inputs.growth_rate_phase1
        } else {
            inputs.growth_rate_phase2
        };
        level *= 1.0 + growth;

        let discount_factor = 1.0 / (1.0 + r).powi(period as i32);
        projections.push(ProjectionRow {
            period,
            cash_flow: level,
            discount_factor,
            present_value: level * discount_factor,
        });
    }

    let pv_cash_flows: f64 = projections.iter().map(|row| row.present_value).sum();

    // n >= 1 after validation
    let last = projections[n - 1];
    let g_t = inputs.terminal_growth_rate;
    let terminal_value = last.cash_flow * (1.0 + g_t) / (r - g_t);
    let present_terminal_value = terminal_value * last.discount_factor;

    let enterprise_value = pv_cash_flows + present_terminal_value;
    let equity_value = enterprise_value - inputs.net_debt;
    let fair_value_per_share = equity_value / inputs.share_count;

    let outputs = [
        pv_cash_flows,
        present_terminal_value,
        enterprise_value,
        equity_value,
        fair_value_per_share,
    ];
    if outputs.iter().any(|v| !v.is_finite()) {
        return Err(FairvalError::invalid(
            "base_cash_flow",
            "valuation overflowed; inputs are too large to value",
        ));
    }

    Ok(ValuationResult {
        projections,
        components: ValuationComponents {
            pv_cash_flows,
            terminal_value,
            present_terminal_value,
            enterprise_value,
            equity_value,
            fair_value_per_share,
        },
        assumptions: Assumptions {
            base_cash_flow: inputs.base_cash_flow,
            net_debt: inputs.net_debt,
            share_count: inputs.share_count,
            discount_rate: r,
            horizon_length: n,
            phase1_length,
            phase2_length,
            growth_rate_phase1: inputs.growth_rate_phase1,
            growth_rate_phase2: inputs.growth_rate_phase2,
            terminal_growth_rate: g_t,
        },
    })
}

fn validate(inputs: &DcfInputs) -> Result<(), FairvalError> {
    require_positive("base_cash_flow", inputs.base_cash_flow)?;
    require_positive("share_count", inputs.share_count)?;
    require_positive("discount_rate", inputs.discount_rate)?;

    require_finite("terminal_growth_rate", inputs.terminal_growth_rate)?;
    if inputs.terminal_growth_rate >= inputs.discount_rate {
        return Err(FairvalError::invalid(
            "terminal_growth_rate",
            format!(
                "terminal growth {} must be less than discount rate {}",
                inputs.terminal_growth_rate, inputs.discount_rate
            ),
        ));
    }

    if inputs.horizon_length < 1 {
        return Err(FairvalError::invalid(
            "horizon_length",
            "horizon must cover at least one period",
        ));
    }

    require_finite("net_debt", inputs.net_debt)?;
    require_finite("growth_rate_phase1", inputs.growth_rate_phase1)?;
    require_finite("growth_rate_phase2", inputs.growth_rate_phase2)?;
    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<(), FairvalError> {
    if !value.is_finite() {
        return Err(FairvalError::invalid(field, "must be a finite number"));
    }
    Ok(())
}

fn require_positive(field: &str, value: f64) -> Result<(), FairvalError> {
    require_finite(field, value)?;
    if value <= 0.0 {
        return Err(FairvalError::invalid(field, "must be positive"));
    }
    Ok(())
}
