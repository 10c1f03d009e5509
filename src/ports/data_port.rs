//! Fundamentals source port trait.

use crate::domain::error::FairvalError;
use crate::domain::fundamentals::Fundamentals;

pub trait DataPort {
    /// Fetch the most recent fundamentals for `ticker`.
    ///
    /// Required values that the source cannot supply are reported as
    /// [`FairvalError::MissingInput`], never substituted with zero.
    fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, FairvalError>;

    fn list_tickers(&self) -> Result<Vec<String>, FairvalError>;
}
