//! CSV upload data adapter.
//!
//! Each upload is a statement table with one row per reporting period.
//! Column names are matched case-insensitively; the most recent row wins.

use crate::domain::error::FairvalError;
use crate::domain::fundamentals::{Fundamentals, StatementFigures};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

const DATE_COLUMNS: [&str; 2] = ["date", "period_end"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_fundamentals(&self, ticker: &str) -> Result<Fundamentals, FairvalError> {
        let path = self.csv_path(ticker);
        tracing::debug!(path = %path.display(), "reading fundamentals upload");
        let file = fs::File::open(&path).map_err(|e| FairvalError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        parse_fundamentals(ticker, file)
    }

    fn list_tickers(&self) -> Result<Vec<String>, FairvalError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FairvalError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FairvalError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(ticker) = name_str.strip_suffix(".csv") {
                if !ticker.is_empty() {
                    tickers.push(ticker.to_string());
                }
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}

/// Column lookup over the selected statement row.
struct Row {
    columns: HashMap<String, usize>,
    record: csv::StringRecord,
}

impl Row {
    fn value(&self, name: &str) -> Result<Option<f64>, FairvalError> {
        let Some(&idx) = self.columns.get(name) else {
            return Ok(None);
        };
        let raw = self.record.get(idx).unwrap_or("").trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let cleaned = strip_thousands(raw).ok_or_else(|| FairvalError::DataSource {
            reason: format!("invalid {} value {:?}: misplaced thousands separator", name, raw),
        })?;
        let value: f64 = cleaned.parse().map_err(|e| FairvalError::DataSource {
            reason: format!("invalid {} value {:?}: {}", name, raw, e),
        })?;
        Ok(Some(value))
    }

    fn first_value(&self, names: &[&str]) -> Result<Option<f64>, FairvalError> {
        for name in names {
            if let Some(v) = self.value(name)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }
}

/// Remove `,` thousands separators, or `None` if they are not in groups of three.
fn strip_thousands(raw: &str) -> Option<String> {
    if !raw.contains(',') {
        return Some(raw.to_string());
    }
    let (integer, fraction) = match raw.split_once('.') {
        Some((i, f)) => (i, f),
        None => (raw, ""),
    };
    if fraction.contains(',') {
        return None;
    }
    let digits = integer.trim_start_matches(['-', '+']);
    let mut groups = digits.split(',');
    let leading = groups.next()?;
    if leading.is_empty() || leading.len() > 3 || !groups.all(|g| g.len() == 3) {
        return None;
    }
    Some(raw.replace(',', ""))
}

/// Parse an uploaded statement table into [`Fundamentals`].
pub fn parse_fundamentals<R: Read>(ticker: &str, reader: R) -> Result<Fundamentals, FairvalError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().map_err(|e| FairvalError::DataSource {
        reason: format!("CSV header error: {}", e),
    })?;
    let columns: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| FairvalError::DataSource {
            reason: format!("CSV parse error: {}", e),
        })?;
        records.push(record);
    }

    let (record, as_of) = select_latest(&columns, records)?;
    let row = Row { columns, record };

    let base_cash_flow = match row.value("fcff")? {
        Some(v) => v,
        None => match (
            row.value("operating_cash_flow")?,
            row.value("capital_expenditures")?,
        ) {
            (Some(ocf), Some(capex)) => ocf - capex,
            _ => return Err(FairvalError::missing("fcff")),
        },
    };

    let share_count = row
        .first_value(&["shares", "shares_outstanding"])?
        .ok_or_else(|| FairvalError::missing("shares"))?;

    let total_debt = row.value("total_debt")?;
    let net_debt = match row.value("net_debt")? {
        Some(v) => v,
        None => {
            let cash = row.first_value(&["cash", "cash_and_equivalents"])?;
            let short_term = row.value("short_term_investments")?.unwrap_or(0.0);
            match (total_debt, cash) {
                (Some(debt), Some(cash)) => debt - (cash + short_term),
                _ => return Err(FairvalError::missing("net_debt")),
            }
        }
    };

    let fundamentals = Fundamentals {
        ticker: ticker.to_string(),
        base_cash_flow,
        net_debt,
        share_count,
        current_price: row.value("current_price")?,
        as_of,
        statement: StatementFigures {
            interest_expense: row.value("interest_expense")?,
            total_debt,
            market_cap: row.value("market_cap")?,
            beta: row.value("beta")?,
            risk_free_rate: row.value("risk_free_rate")?,
        },
    };

    tracing::debug!(
        ticker,
        fcff = fundamentals.base_cash_flow,
        net_debt = fundamentals.net_debt,
        shares = fundamentals.share_count,
        "parsed fundamentals"
    );
    Ok(fundamentals)
}

/// Pick the most recent row: latest period date if the table is dated, else the last row.
fn select_latest(
    columns: &HashMap<String, usize>,
    records: Vec<csv::StringRecord>,
) -> Result<(csv::StringRecord, Option<NaiveDate>), FairvalError> {
    let date_idx = DATE_COLUMNS.iter().find_map(|c| columns.get(*c).copied());

    let mut latest: Option<(NaiveDate, csv::StringRecord)> = None;
    let mut last: Option<csv::StringRecord> = None;

    for record in records {
        if let Some(idx) = date_idx {
            let raw = record.get(idx).unwrap_or("").trim();
            if !raw.is_empty() {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                    FairvalError::DataSource {
                        reason: format!("invalid date {:?}: {}", raw, e),
                    }
                })?;
                if latest.as_ref().is_none_or(|(d, _)| date >= *d) {
                    latest = Some((date, record.clone()));
                }
            }
        }
        last = Some(record);
    }

    match (latest, last) {
        (Some((date, record)), _) => Ok((record, Some(date))),
        (None, Some(record)) => Ok((record, None)),
        (None, None) => Err(FairvalError::DataSource {
            reason: "upload contains no data rows".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> Result<Fundamentals, FairvalError> {
        parse_fundamentals("TEST", content.as_bytes())
    }

    #[test]
    fn parses_direct_columns_from_last_row() {
        let f = parse(
            "fcff,net_debt,shares,current_price\n\
             900,300,12,1500\n\
             1000,250,12.5,1600\n",
        )
        .unwrap();

        assert_eq!(f.ticker, "TEST");
        assert_eq!(f.base_cash_flow, 1000.0);
        assert_eq!(f.net_debt, 250.0);
        assert_eq!(f.share_count, 12.5);
        assert_eq!(f.current_price, Some(1600.0));
        assert_eq!(f.as_of, None);
    }

    #[test]
    fn header_matching_ignores_case_and_whitespace() {
        let f = parse(" FCFF , Net_Debt ,Shares_Outstanding\n100, -20, 5\n").unwrap();
        assert_eq!(f.base_cash_flow, 100.0);
        assert_eq!(f.net_debt, -20.0);
        assert_eq!(f.share_count, 5.0);
    }

    #[test]
    fn derives_fcff_from_operating_cash_flow_and_capex() {
        let f = parse(
            "operating_cash_flow,capital_expenditures,net_debt,shares\n\
             1500,400,100,10\n",
        )
        .unwrap();
        assert_eq!(f.base_cash_flow, 1100.0);
    }

    #[test]
    fn explicit_fcff_takes_precedence() {
        let f = parse(
            "fcff,operating_cash_flow,capital_expenditures,net_debt,shares\n\
             700,1500,400,100,10\n",
        )
        .unwrap();
        assert_eq!(f.base_cash_flow, 700.0);
    }

    #[test]
    fn missing_cash_flow_is_reported() {
        let err = parse("operating_cash_flow,net_debt,shares\n1500,100,10\n").unwrap_err();
        assert!(matches!(err, FairvalError::MissingInput { field } if field == "fcff"));
    }

    #[test]
    fn missing_shares_is_reported() {
        let err = parse("fcff,net_debt\n100,10\n").unwrap_err();
        assert!(matches!(err, FairvalError::MissingInput { field } if field == "shares"));
    }

    #[test]
    fn empty_net_debt_cell_is_missing_not_zero() {
        let err = parse("fcff,net_debt,shares\n100,,10\n").unwrap_err();
        assert!(matches!(err, FairvalError::MissingInput { field } if field == "net_debt"));
    }

    #[test]
    fn derives_net_debt_from_debt_and_cash() {
        let f = parse("fcff,total_debt,cash_and_equivalents,shares\n100,800,300,10\n").unwrap();
        assert_eq!(f.net_debt, 500.0);
        assert_eq!(f.statement.total_debt, Some(800.0));
    }

    #[test]
    fn net_debt_nets_short_term_investments() {
        let f = parse(
            "fcff,total_debt,cash,short_term_investments,shares\n100,800,300,150,10\n",
        )
        .unwrap();
        assert_eq!(f.net_debt, 350.0);
    }

    #[test]
    fn picks_latest_dated_row_regardless_of_order() {
        let f = parse(
            "date,fcff,net_debt,shares\n\
             2024-03-31,1200,100,10\n\
             2022-03-31,800,150,10\n\
             2023-03-31,1000,120,10\n",
        )
        .unwrap();
        assert_eq!(f.base_cash_flow, 1200.0);
        assert_eq!(f.as_of, NaiveDate::from_ymd_opt(2024, 3, 31));
    }

    #[test]
    fn invalid_date_is_data_source_error() {
        let err = parse("period_end,fcff,net_debt,shares\n31/03/2024,1,1,1\n").unwrap_err();
        assert!(matches!(err, FairvalError::DataSource { .. }));
    }

    #[test]
    fn non_numeric_cell_is_data_source_error() {
        let err = parse("fcff,net_debt,shares\nabc,1,1\n").unwrap_err();
        assert!(matches!(err, FairvalError::DataSource { .. }));
    }

    #[test]
    fn thousands_separators_are_accepted() {
        let f = parse("fcff,net_debt,shares\n\"1,250.5\",0,10\n").unwrap();
        assert_eq!(f.base_cash_flow, 1250.5);
    }

    #[test]
    fn misplaced_commas_are_rejected() {
        for cell in ["\"1,2,3\"", "\"12,34\"", "\",100\"", "\"1,000.0,5\""] {
            let content = format!("fcff,net_debt,shares\n{cell},0,10\n");
            let err = parse(&content).unwrap_err();
            assert!(matches!(err, FairvalError::DataSource { .. }), "{cell}");
        }
    }

    #[test]
    fn grouped_negative_values_parse() {
        let f = parse("fcff,net_debt,shares\n100,\"-1,200,000\",10\n").unwrap();
        assert_eq!(f.net_debt, -1_200_000.0);
    }

    #[test]
    fn header_only_upload_fails() {
        let err = parse("fcff,net_debt,shares\n").unwrap_err();
        assert!(matches!(err, FairvalError::DataSource { .. }));
    }

    #[test]
    fn reads_optional_statement_figures() {
        let f = parse(
            "fcff,net_debt,shares,interest_expense,total_debt,market_cap,beta,risk_free_rate\n\
             100,50,10,-12,150,2000,1.1,0.07\n",
        )
        .unwrap();
        assert_eq!(
            f.statement,
            StatementFigures {
                interest_expense: Some(-12.0),
                total_debt: Some(150.0),
                market_cap: Some(2000.0),
                beta: Some(1.1),
                risk_free_rate: Some(0.07),
            }
        );
    }

    fn setup_upload_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("TCS.csv"),
            "fcff,net_debt,shares\n4000,-500,36\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("INFY.csv"),
            "fcff,net_debt,shares\n2500,-300,41\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn fetch_fundamentals_reads_ticker_file() {
        let dir = setup_upload_dir();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let f = adapter.fetch_fundamentals("TCS").unwrap();
        assert_eq!(f.ticker, "TCS");
        assert_eq!(f.base_cash_flow, 4000.0);
        assert_eq!(f.net_debt, -500.0);
    }

    #[test]
    fn fetch_fundamentals_missing_file_fails() {
        let dir = setup_upload_dir();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let err = adapter.fetch_fundamentals("WIPRO").unwrap_err();
        assert!(matches!(err, FairvalError::DataSource { .. }));
    }

    #[test]
    fn list_tickers_returns_sorted_csv_stems() {
        let dir = setup_upload_dir();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.list_tickers().unwrap(), vec!["INFY", "TCS"]);
    }
}
