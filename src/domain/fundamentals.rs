//! Company fundamentals supplied to the valuation engine.

use chrono::NaiveDate;

/// Optional capital-structure figures used by the best-effort WACC estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatementFigures {
    pub interest_expense: Option<f64>,
    pub total_debt: Option<f64>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub risk_free_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fundamentals {
    pub ticker: String,
    pub base_cash_flow: f64,
    pub net_debt: f64,
    pub share_count: f64,
    pub current_price: Option<f64>,
    /// Period end of the statement row the figures came from, when known.
    pub as_of: Option<NaiveDate>,
    pub statement: StatementFigures,
}

impl Fundamentals {
    pub fn new(ticker: &str, base_cash_flow: f64, net_debt: f64, share_count: f64) -> Self {
        Self {
            ticker: ticker.to_string(),
            base_cash_flow,
            net_debt,
            share_count,
            current_price: None,
            as_of: None,
            statement: StatementFigures::default(),
        }
    }

    /// Market capitalisation implied by the current price, if one is known.
    pub fn implied_market_cap(&self) -> Option<f64> {
        self.current_price
            .filter(|p| *p > 0.0)
            .map(|p| p * self.share_count)
    }
}
