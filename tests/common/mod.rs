#![allow(dead_code)]

use fairval::domain::dcf::DcfInputs;
use fairval::domain::error::FairvalError;
pub use fairval::domain::fundamentals::Fundamentals;
use fairval::ports::data_port::DataPort;
use fairval::ports::rate_port::{RateEstimate, RatePort};
use std::collections::HashMap;
use std::io::Write;

pub struct MockDataPort {
    pub data: HashMap<String, Fundamentals>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_company(mut self, fundamentals: Fundamentals) -> Self {
        self.data.insert(fundamentals.ticker.clone(), fundamentals);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, FairvalError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(FairvalError::DataSource {
                reason: reason.clone(),
            });
        }
        self.data
            .get(ticker)
            .cloned()
            .ok_or_else(|| FairvalError::MissingInput {
                field: format!("{ticker} fundamentals"),
            })
    }

    fn list_tickers(&self) -> Result<Vec<String>, FairvalError> {
        let mut tickers: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// Rate provider that always answers with the same value, or with nothing.
pub struct FixedRate(pub Option<f64>);

impl RatePort for FixedRate {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn discount_rate(
        &self,
        _: Option<&Fundamentals>,
    ) -> Result<Option<RateEstimate>, FairvalError> {
        Ok(self.0.map(RateEstimate::manual))
    }
}

pub fn company(ticker: &str, fcff: f64, net_debt: f64, shares: f64) -> Fundamentals {
    Fundamentals::new(ticker, fcff, net_debt, shares)
}

pub fn known_inputs() -> DcfInputs {
    DcfInputs {
        base_cash_flow: 100.0,
        net_debt: 200.0,
        share_count: 10.0,
        discount_rate: 0.12,
        horizon_length: 2,
        growth_rate_phase1: 0.10,
        growth_rate_phase2: 0.10,
        terminal_growth_rate: 0.04,
    }
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
