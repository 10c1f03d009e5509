//! Discount-rate providers: manual entry, CAPM/WACC, and best-effort auto WACC.

use crate::domain::capital::{estimate_wacc, CapmInputs, WaccDefaults};
use crate::domain::error::FairvalError;
use crate::domain::fundamentals::Fundamentals;
use crate::ports::rate_port::{RateEstimate, RatePort};

/// A rate entered directly by the user.
pub struct ManualRate {
    rate: f64,
}

impl ManualRate {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl RatePort for ManualRate {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn discount_rate(
        &self,
        _: Option<&Fundamentals>,
    ) -> Result<Option<RateEstimate>, FairvalError> {
        if !self.rate.is_finite() {
            return Ok(None);
        }
        Ok(Some(RateEstimate::manual(self.rate)))
    }
}

/// WACC from explicitly supplied CAPM inputs.
pub struct CapmRate {
    inputs: CapmInputs,
}

impl CapmRate {
    pub fn new(inputs: CapmInputs) -> Self {
        Self { inputs }
    }
}

impl RatePort for CapmRate {
    fn name(&self) -> &'static str {
        "capm"
    }

    fn discount_rate(
        &self,
        _: Option<&Fundamentals>,
    ) -> Result<Option<RateEstimate>, FairvalError> {
        self.inputs.validate()?;
        Ok(Some(RateEstimate {
            rate: self.inputs.wacc(),
            source: self.name(),
            breakdown: Some(self.inputs),
            fallbacks: Vec::new(),
        }))
    }
}

/// WACC estimated from whatever statement figures the company upload carries.
pub struct AutoWaccRate {
    defaults: WaccDefaults,
}

impl AutoWaccRate {
    pub fn new(defaults: WaccDefaults) -> Self {
        Self { defaults }
    }
}

impl RatePort for AutoWaccRate {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn discount_rate(
        &self,
        company: Option<&Fundamentals>,
    ) -> Result<Option<RateEstimate>, FairvalError> {
        let Some(fundamentals) = company else {
            return Ok(None);
        };
        let mut figures = fundamentals.statement;
        if figures.market_cap.is_none() {
            figures.market_cap = fundamentals.implied_market_cap();
        }

        let estimate = estimate_wacc(&figures, &self.defaults);
        estimate.breakdown.validate()?;
        if !estimate.wacc.is_finite() || estimate.wacc <= 0.0 {
            tracing::warn!(
                ticker = %fundamentals.ticker,
                wacc = estimate.wacc,
                "auto WACC produced an unusable rate"
            );
            return Ok(None);
        }

        if estimate.is_low_confidence() {
            let defaulted: Vec<String> = estimate.fallbacks.iter().map(|f| f.to_string()).collect();
            tracing::warn!(
                ticker = %fundamentals.ticker,
                defaulted = %defaulted.join(", "),
                "auto WACC used default inputs"
            );
        }

        Ok(Some(RateEstimate {
            rate: estimate.wacc,
            source: self.name(),
            breakdown: Some(estimate.breakdown),
            fallbacks: estimate.fallbacks,
        }))
    }
}
