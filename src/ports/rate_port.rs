//! Discount-rate provider port trait.

use crate::domain::capital::{CapmInputs, Fallback};
use crate::domain::error::FairvalError;
use crate::domain::fundamentals::Fundamentals;

/// A discount rate together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RateEstimate {
    pub rate: f64,
    pub source: &'static str,
    pub breakdown: Option<CapmInputs>,
    /// Inputs the provider had to default because data was unavailable.
    pub fallbacks: Vec<Fallback>,
}

impl RateEstimate {
    pub fn manual(rate: f64) -> Self {
        Self {
            rate,
            source: "manual",
            breakdown: None,
            fallbacks: Vec::new(),
        }
    }

    pub fn is_low_confidence(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

pub trait RatePort {
    fn name(&self) -> &'static str;

    /// Attempt to produce a discount rate, optionally for a specific company.
    ///
    /// `Ok(None)` means the provider has nothing to offer; it never returns a
    /// zeroed rate in place of a missing one.
    fn discount_rate(
        &self,
        company: Option<&Fundamentals>,
    ) -> Result<Option<RateEstimate>, FairvalError>;
}
