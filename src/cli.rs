//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{parse_fundamentals, CsvAdapter};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::rate_adapter::{AutoWaccRate, CapmRate, ManualRate};
use crate::domain::capital::{CapmInputs, DiscountMethod, WaccDefaults};
use crate::domain::config_validation::{
    discount_method, validate_company_config, validate_dcf_config, validate_discount_config,
    DEFAULT_GROWTH_PHASE1,
    DEFAULT_GROWTH_PHASE2, DEFAULT_HORIZON_YEARS, DEFAULT_MANUAL_RATE, DEFAULT_TERMINAL_GROWTH,
};
use crate::domain::dcf::{run_dcf, DcfInputs, ValuationResult};
use crate::domain::error::FairvalError;
use crate::domain::fundamentals::Fundamentals;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::rate_port::{RateEstimate, RatePort};
use crate::ports::report_port::{ReportPort, ValuationReport};

const DEFAULT_TICKER: &str = "custom";

#[derive(Parser, Debug)]
#[command(name = "fairval", about = "Discounted-cash-flow fair value estimator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Value a single company
    Value {
        #[arg(short, long)]
        config: PathBuf,
        /// Statement upload (CSV) to read fundamentals from
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        ticker: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the configured discount rate
        #[arg(long)]
        discount_rate: Option<f64>,
    },
    /// Value every upload in the configured data directory
    Batch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Show the discount rate the configuration resolves to
    Rate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        ticker: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Growth and horizon assumptions shared by every company in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcfSettings {
    pub horizon_length: usize,
    pub growth_rate_phase1: f64,
    pub growth_rate_phase2: f64,
    pub terminal_growth_rate: f64,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Value {
            config,
            input,
            ticker,
            output,
            discount_rate,
        } => run_value(
            &config,
            input.as_ref(),
            ticker.as_deref(),
            output.as_ref(),
            discount_rate,
        ),
        Command::Batch { config, output_dir } => run_batch(&config, output_dir.as_ref()),
        Command::Rate {
            config,
            input,
            ticker,
        } => run_rate(&config, input.as_ref(), ticker.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &FairvalError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, FairvalError> {
    FileConfigAdapter::from_file(path).map_err(|e| FairvalError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), FairvalError> {
    validate_dcf_config(config)?;
    validate_discount_config(config)?;
    validate_company_config(config)?;
    Ok(())
}

pub fn build_dcf_settings(config: &dyn ConfigPort) -> Result<DcfSettings, FairvalError> {
    let horizon = config.get_int("dcf", "horizon_years", DEFAULT_HORIZON_YEARS);
    let horizon_length = usize::try_from(horizon).map_err(|_| FairvalError::ConfigInvalid {
        section: "dcf".into(),
        key: "horizon_years".into(),
        reason: "horizon_years must be positive".into(),
    })?;

    Ok(DcfSettings {
        horizon_length,
        growth_rate_phase1: config.get_double("dcf", "growth_phase1", DEFAULT_GROWTH_PHASE1),
        growth_rate_phase2: config.get_double("dcf", "growth_phase2", DEFAULT_GROWTH_PHASE2),
        terminal_growth_rate: config.get_double(
            "dcf",
            "terminal_growth",
            DEFAULT_TERMINAL_GROWTH,
        ),
    })
}

pub fn build_wacc_defaults(config: &dyn ConfigPort) -> WaccDefaults {
    let d = WaccDefaults::default();
    WaccDefaults {
        risk_free_rate: config.get_double("discount", "risk_free_rate", d.risk_free_rate),
        beta: config.get_double("discount", "beta", d.beta),
        equity_risk_premium: config.get_double(
            "discount",
            "equity_risk_premium",
            d.equity_risk_premium,
        ),
        pre_tax_cost_of_debt: config.get_double("discount", "cost_of_debt", d.pre_tax_cost_of_debt),
        tax_rate: config.get_double("discount", "tax_rate", d.tax_rate),
        equity_weight: config.get_double("discount", "equity_weight", d.equity_weight),
    }
}

/// Build the configured discount-rate provider. A CLI override always wins.
pub fn build_rate_provider(
    config: &dyn ConfigPort,
    rate_override: Option<f64>,
) -> Result<Box<dyn RatePort>, FairvalError> {
    if let Some(rate) = rate_override {
        return Ok(Box::new(ManualRate::new(rate)));
    }

    let provider: Box<dyn RatePort> = match discount_method(config)? {
        DiscountMethod::Manual => Box::new(ManualRate::new(config.get_double(
            "discount",
            "rate",
            DEFAULT_MANUAL_RATE,
        ))),
        DiscountMethod::Capm => {
            let d = build_wacc_defaults(config);
            Box::new(CapmRate::new(CapmInputs {
                risk_free_rate: d.risk_free_rate,
                beta: d.beta,
                equity_risk_premium: d.equity_risk_premium,
                pre_tax_cost_of_debt: d.pre_tax_cost_of_debt,
                tax_rate: d.tax_rate,
                equity_weight: d.equity_weight,
            }))
        }
        DiscountMethod::Auto => Box::new(AutoWaccRate::new(build_wacc_defaults(config))),
    };
    Ok(provider)
}

pub fn resolve_ticker(ticker_override: Option<&str>, config: &dyn ConfigPort) -> Option<String> {
    ticker_override
        .map(str::to_string)
        .or_else(|| config.get_string("data", "ticker"))
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
}

/// Fundamentals entered by hand in the `[company]` section.
pub fn manual_fundamentals(
    config: &dyn ConfigPort,
    ticker: &str,
) -> Result<Fundamentals, FairvalError> {
    let required = |key: &str| {
        config
            .get_opt_double("company", key)
            .ok_or_else(|| FairvalError::MissingInput {
                field: key.to_string(),
            })
    };
    let mut fundamentals = Fundamentals::new(
        ticker,
        required("base_cash_flow")?,
        required("net_debt")?,
        required("share_count")?,
    );
    fundamentals.current_price = config.get_opt_double("company", "current_price");
    Ok(fundamentals)
}

/// Values in `[company]` take precedence over sourced figures.
pub fn apply_overrides(fundamentals: &mut Fundamentals, config: &dyn ConfigPort) {
    if let Some(v) = config.get_opt_double("company", "base_cash_flow") {
        fundamentals.base_cash_flow = v;
    }
    if let Some(v) = config.get_opt_double("company", "net_debt") {
        fundamentals.net_debt = v;
    }
    if let Some(v) = config.get_opt_double("company", "share_count") {
        fundamentals.share_count = v;
    }
    if let Some(v) = config.get_opt_double("company", "current_price") {
        fundamentals.current_price = Some(v);
    }
}

/// Resolve fundamentals from an upload, the data directory, or `[company]`, in that order.
pub fn load_fundamentals(
    config: &dyn ConfigPort,
    input: Option<&PathBuf>,
    ticker: Option<&str>,
) -> Result<Fundamentals, FairvalError> {
    validate_company_config(config)?;
    let ticker = resolve_ticker(ticker, config);

    if let Some(path) = input {
        let name = ticker.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_uppercase())
                .unwrap_or_else(|| DEFAULT_TICKER.to_string())
        });
        eprintln!("Reading upload {}", path.display());
        let file = fs::File::open(path).map_err(|e| FairvalError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let mut fundamentals = parse_fundamentals(&name, file)?;
        apply_overrides(&mut fundamentals, config);
        return Ok(fundamentals);
    }

    if let Some(dir) = config.get_string("data", "directory") {
        let ticker = ticker.ok_or_else(|| FairvalError::ConfigMissing {
            section: "data".into(),
            key: "ticker".into(),
        })?;
        let adapter = CsvAdapter::new(PathBuf::from(dir));
        let mut fundamentals = adapter.fetch_fundamentals(&ticker)?;
        apply_overrides(&mut fundamentals, config);
        return Ok(fundamentals);
    }

    manual_fundamentals(config, ticker.as_deref().unwrap_or(DEFAULT_TICKER))
}

/// Resolve a discount rate for the company and run the engine.
pub fn value_company(
    fundamentals: &Fundamentals,
    settings: &DcfSettings,
    rate_port: &dyn RatePort,
) -> Result<(ValuationResult, RateEstimate), FairvalError> {
    let rate = rate_port
        .discount_rate(Some(fundamentals))?
        .ok_or_else(|| FairvalError::NoDiscountRate {
            source_name: rate_port.name().to_string(),
        })?;

    let inputs = DcfInputs {
        base_cash_flow: fundamentals.base_cash_flow,
        net_debt: fundamentals.net_debt,
        share_count: fundamentals.share_count,
        discount_rate: rate.rate,
        horizon_length: settings.horizon_length,
        growth_rate_phase1: settings.growth_rate_phase1,
        growth_rate_phase2: settings.growth_rate_phase2,
        terminal_growth_rate: settings.terminal_growth_rate,
    };
    tracing::debug!(ticker = %fundamentals.ticker, ?inputs, "running DCF");

    let result = run_dcf(&inputs)?;
    Ok((result, rate))
}

pub fn default_output_path(ticker: &str, config: &dyn ConfigPort) -> PathBuf {
    config
        .get_string("report", "output")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}_dcf_projection.csv", ticker)))
}

fn print_rate(rate: &RateEstimate) {
    eprintln!("Discount rate:    {:.2}% ({})", rate.rate * 100.0, rate.source);
    if let Some(b) = rate.breakdown {
        eprintln!("  Risk-free:      {:.2}%", b.risk_free_rate * 100.0);
        eprintln!("  Beta:           {:.2}", b.beta);
        eprintln!("  Equity premium: {:.2}%", b.equity_risk_premium * 100.0);
        eprintln!("  Cost of equity: {:.2}%", b.cost_of_equity() * 100.0);
        eprintln!("  Cost of debt:   {:.2}% pre-tax", b.pre_tax_cost_of_debt * 100.0);
        eprintln!("  Tax rate:       {:.2}%", b.tax_rate * 100.0);
        eprintln!(
            "  Weights:        {:.0}% equity / {:.0}% debt",
            b.equity_weight * 100.0,
            b.debt_weight() * 100.0
        );
    }
    if rate.is_low_confidence() {
        let defaulted: Vec<String> = rate.fallbacks.iter().map(|f| f.to_string()).collect();
        eprintln!(
            "  warning: low-confidence estimate, defaulted {}",
            defaulted.join(", ")
        );
    }
}

fn print_summary(fundamentals: &Fundamentals, result: &ValuationResult, rate: &RateEstimate) {
    let a = &result.assumptions;
    let c = &result.components;
    let summary = result.summary();

    eprintln!("\n=== Valuation: {} ===", fundamentals.ticker);
    if let Some(as_of) = fundamentals.as_of {
        eprintln!("Statement date:   {}", as_of);
    }
    print_rate(rate);
    eprintln!(
        "Assumptions:      {} years, g1={:.2}% ({}y), g2={:.2}% ({}y), gT={:.2}%",
        a.horizon_length,
        a.growth_rate_phase1 * 100.0,
        a.phase1_length,
        a.growth_rate_phase2 * 100.0,
        a.phase2_length,
        a.terminal_growth_rate * 100.0,
    );

    eprintln!("\n{:>6} {:>14} {:>10} {:>14}", "Year", "Cash flow", "Factor", "PV");
    for row in &result.projections {
        eprintln!(
            "{:>6} {:>14.2} {:>10.6} {:>14.2}",
            row.period, row.cash_flow, row.discount_factor, row.present_value
        );
    }

    eprintln!("\nPV of cash flows: {:.2}", c.pv_cash_flows);
    eprintln!(
        "PV of terminal:   {:.2} ({:.1}% of EV)",
        c.present_terminal_value,
        result.terminal_share() * 100.0
    );
    eprintln!("Enterprise value: {:.2}", summary.enterprise_value);
    eprintln!("(-) Net debt:     {:.2}", a.net_debt);
    eprintln!("Equity value:     {:.2}", summary.equity_value);
    eprintln!("Fair value/share: {:.2}", summary.fair_value_per_share);
    if let Some(upside) = result.upside(fundamentals.current_price) {
        eprintln!("Upside vs price:  {:.1}%", upside * 100.0);
    }
}

pub fn build_report_adapter(config: &dyn ConfigPort) -> CsvReportAdapter {
    if config.get_bool("report", "summary", true) {
        CsvReportAdapter::new()
    } else {
        CsvReportAdapter::projection_only()
    }
}

fn write_report(
    reporter: &dyn ReportPort,
    fundamentals: &Fundamentals,
    result: &ValuationResult,
    rate: &RateEstimate,
    output: &Path,
) -> Result<(), FairvalError> {
    let report = ValuationReport {
        ticker: &fundamentals.ticker,
        result,
        rate,
        current_price: fundamentals.current_price,
    };
    reporter.write(&report, &output.to_string_lossy())
}

fn run_value(
    config_path: &Path,
    input: Option<&PathBuf>,
    ticker: Option<&str>,
    output: Option<&PathBuf>,
    rate_override: Option<f64>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_config(&config) {
        return fail(&e);
    }

    // Stage 2: Assumptions and discount-rate provider
    let settings = match build_dcf_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let rate_port = match build_rate_provider(&config, rate_override) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    // Stage 3: Fundamentals
    let fundamentals = match load_fundamentals(&config, input, ticker) {
        Ok(f) => f,
        Err(e) => return fail(&e),
    };

    // Stage 4: Valuation
    let (result, rate) = match value_company(&fundamentals, &settings, rate_port.as_ref()) {
        Ok(v) => v,
        Err(e) => return fail(&e),
    };
    print_summary(&fundamentals, &result, &rate);

    // Stage 5: Report
    let output = output
        .cloned()
        .unwrap_or_else(|| default_output_path(&fundamentals.ticker, &config));
    let reporter = build_report_adapter(&config);
    match write_report(&reporter, &fundamentals, &result, &rate, &output) {
        Ok(()) => {
            eprintln!("\nProjection written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_batch(config_path: &Path, output_dir: Option<&PathBuf>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_config(&config) {
        return fail(&e);
    }

    let settings = match build_dcf_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let rate_port = match build_rate_provider(&config, None) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let Some(dir) = config.get_string("data", "directory") else {
        return fail(&FairvalError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        });
    };
    let adapter = CsvAdapter::new(PathBuf::from(dir));
    let tickers = match adapter.list_tickers() {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };
    if tickers.is_empty() {
        eprintln!("error: no uploads found in data directory");
        return ExitCode::from(3);
    }

    let out_dir = output_dir.cloned().unwrap_or_else(|| PathBuf::from("."));
    let reporter = build_report_adapter(&config);
    eprintln!("Valuing {} companies...", tickers.len());

    let mut valued = 0usize;
    for ticker in &tickers {
        let outcome = adapter.fetch_fundamentals(ticker).and_then(|mut f| {
            apply_overrides(&mut f, &config);
            let (result, rate) = value_company(&f, &settings, rate_port.as_ref())?;
            let output = out_dir.join(format!("{}_dcf_projection.csv", ticker));
            write_report(&reporter, &f, &result, &rate, &output)?;
            Ok((f, result, rate))
        });

        match outcome {
            Ok((f, result, rate)) => {
                valued += 1;
                let flag = if rate.is_low_confidence() { " [low-confidence rate]" } else { "" };
                match result.upside(f.current_price) {
                    Some(upside) => eprintln!(
                        "  {}: fair value {:.2} ({:+.1}% vs price) @ {:.2}%{}",
                        ticker,
                        result.summary().fair_value_per_share,
                        upside * 100.0,
                        rate.rate * 100.0,
                        flag
                    ),
                    None => eprintln!(
                        "  {}: fair value {:.2} @ {:.2}%{}",
                        ticker,
                        result.summary().fair_value_per_share,
                        rate.rate * 100.0,
                        flag
                    ),
                }
            }
            Err(e) => {
                tracing::warn!(ticker = %ticker, error = %e, "valuation failed");
                eprintln!("warning: skipping {} ({})", ticker, e);
            }
        }
    }

    eprintln!("\n{} of {} companies valued", valued, tickers.len());
    if valued == 0 {
        return ExitCode::from(3);
    }
    ExitCode::SUCCESS
}

fn run_rate(config_path: &Path, input: Option<&PathBuf>, ticker: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let validated =
        validate_discount_config(&config).and_then(|_| validate_company_config(&config));
    if let Err(e) = validated {
        return fail(&e);
    }
    let rate_port = match build_rate_provider(&config, None) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let fundamentals = match load_fundamentals(&config, input, ticker) {
        Ok(f) => Some(f),
        Err(e) => {
            tracing::debug!(error = %e, "no company data for rate estimate");
            None
        }
    };

    match rate_port.discount_rate(fundamentals.as_ref()) {
        Ok(Some(rate)) => {
            print_rate(&rate);
            println!("{:.6}", rate.rate);
            ExitCode::SUCCESS
        }
        Ok(None) => fail(&FairvalError::NoDiscountRate {
            source_name: rate_port.name().to_string(),
        }),
        Err(e) => fail(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Err(e) = validate_config(&config) {
        return fail(&e);
    }

    let settings = match build_dcf_settings(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let method = match discount_method(&config) {
        Ok(m) => m,
        Err(e) => return fail(&e),
    };

    eprintln!(
        "  horizon: {} years, g1={:.2}%, g2={:.2}%, gT={:.2}%",
        settings.horizon_length,
        settings.growth_rate_phase1 * 100.0,
        settings.growth_rate_phase2 * 100.0,
        settings.terminal_growth_rate * 100.0,
    );
    eprintln!("  discount method: {:?}", method);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
