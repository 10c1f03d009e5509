//! CSV report adapter implementing ReportPort.
//!
//! Writes the projection table to the requested path and a two-column
//! `metric,value` summary next to it (`<stem>_summary.csv`).

use std::path::{Path, PathBuf};

use crate::domain::error::FairvalError;
use crate::ports::report_port::{ReportPort, ValuationReport};

pub struct CsvReportAdapter {
    summary: bool,
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self { summary: true }
    }

    /// Write the projection table only.
    pub fn projection_only() -> Self {
        Self { summary: false }
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn summary_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "valuation".to_string());
    output_path.with_file_name(format!("{}_summary.csv", stem))
}

fn csv_error(path: &Path, e: csv::Error) -> FairvalError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => FairvalError::Io(io),
        other => FairvalError::DataSource {
            reason: format!("failed to write {}: {:?}", path.display(), other),
        },
    }
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn pct(value: f64) -> String {
    format!("{:.2}", value * 100.0)
}

/// `(metric, value)` rows of the summary file.
pub fn summary_rows(report: &ValuationReport<'_>) -> Vec<(&'static str, String)> {
    let c = &report.result.components;
    let a = &report.result.assumptions;
    let mut rows = vec![
        ("ticker", report.ticker.to_string()),
        ("discount_rate_pct", pct(report.rate.rate)),
        ("rate_source", report.rate.source.to_string()),
        ("low_confidence_rate", report.rate.is_low_confidence().to_string()),
        ("horizon_years", a.horizon_length.to_string()),
        ("growth_phase1_pct", pct(a.growth_rate_phase1)),
        ("growth_phase2_pct", pct(a.growth_rate_phase2)),
        ("terminal_growth_pct", pct(a.terminal_growth_rate)),
        ("base_cash_flow", money(a.base_cash_flow)),
        ("pv_cash_flows", money(c.pv_cash_flows)),
        ("terminal_value", money(c.terminal_value)),
        ("pv_terminal_value", money(c.present_terminal_value)),
        ("enterprise_value", money(c.enterprise_value)),
        ("net_debt", money(a.net_debt)),
        ("equity_value", money(c.equity_value)),
        ("share_count", a.share_count.to_string()),
        ("fair_value_per_share", money(c.fair_value_per_share)),
    ];
    if let Some(price) = report.current_price {
        rows.push(("current_price", money(price)));
    }
    if let Some(upside) = report.result.upside(report.current_price) {
        rows.push(("upside_pct", pct(upside)));
    }
    rows
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &ValuationReport<'_>, output_path: &str) -> Result<(), FairvalError> {
        let path = Path::new(output_path);

        let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
        for row in &report.result.projections {
            wtr.serialize(row).map_err(|e| csv_error(path, e))?;
        }
        wtr.flush()?;

        if !self.summary {
            tracing::debug!(projection = %path.display(), "report written");
            return Ok(());
        }

        let summary = summary_path(path);
        let mut wtr = csv::Writer::from_path(&summary).map_err(|e| csv_error(&summary, e))?;
        wtr.write_record(["metric", "value"])
            .map_err(|e| csv_error(&summary, e))?;
        for (metric, value) in summary_rows(report) {
            wtr.write_record([metric, value.as_str()])
                .map_err(|e| csv_error(&summary, e))?;
        }
        wtr.flush()?;

        tracing::debug!(
            projection = %path.display(),
            summary = %summary.display(),
            "report written"
        );
        Ok(())
    }
}
