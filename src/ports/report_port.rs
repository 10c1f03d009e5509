//! Report generation port trait.

use crate::domain::dcf::ValuationResult;
use crate::domain::error::FairvalError;
use crate::ports::rate_port::RateEstimate;

/// Everything a report needs about one valuation.
#[derive(Debug, Clone)]
pub struct ValuationReport<'a> {
    pub ticker: &'a str,
    pub result: &'a ValuationResult,
    pub rate: &'a RateEstimate,
    pub current_price: Option<f64>,
}

/// Port for writing valuation reports.
pub trait ReportPort {
    fn write(&self, report: &ValuationReport<'_>, output_path: &str) -> Result<(), FairvalError>;
}
