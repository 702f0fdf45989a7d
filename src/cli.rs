//! CLI definition and dispatch.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{read_bars_file, CsvAdapter, TIMESTAMP_FORMAT};
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::batch::{analyze_universe, BatchReport};
use crate::domain::commission::{CommissionModel, DEFAULT_COMMISSION_FLOOR, DEFAULT_COMMISSION_PCT};
use crate::domain::config_validation::{validate_data_config, ConfigWarning};
use crate::domain::error::RoundtripError;
use crate::domain::instrument::{parse_codes, select_instruments, Instrument};
use crate::domain::refresh_plan::plan_refresh;
use crate::domain::result::AnalysisOutcome;
use crate::domain::simulation::{
    default_buy_time, default_sell_time, AnalysisConfig, DEFAULT_STARTING_CASH,
    DEFAULT_WINDOW_DAYS,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Parser, Debug)]
#[command(
    name = "roundtrip",
    about = "Intraday sell-at-open, rebuy-at-close backtester"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest every configured instrument
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        /// Analyze only these codes (comma separated)
        #[arg(long)]
        code: Option<String>,
        /// Directory for CSV reports, overrides [report] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load a bar file into the configured store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Show which data requests each instrument needs
    Plan {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Analyze {
            config,
            code,
            output,
        } => run_analyze(&config, code.as_deref(), output.as_deref()),
        Command::Import {
            config,
            code,
            name,
            input,
        } => run_import(&config, &code, name.as_deref(), &input),
        Command::Plan { config } => run_plan(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: RoundtripError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

fn parse_time(config: &dyn ConfigPort, key: &str, default: NaiveTime) -> Result<NaiveTime, RoundtripError> {
    match config.get_string("analysis", key) {
        Some(v) if !v.is_empty() => NaiveTime::parse_from_str(&v, TIME_FORMAT).map_err(|_| {
            RoundtripError::invalid("analysis", key, format!("'{v}' is not a time (expected HH:MM)"))
        }),
        _ => Ok(default),
    }
}

pub fn build_analysis_config(config: &dyn ConfigPort) -> Result<AnalysisConfig, RoundtripError> {
    let commission = CommissionModel::new(
        config.get_decimal("analysis", "commission_pct", DEFAULT_COMMISSION_PCT)?,
        config.get_decimal("analysis", "commission_floor", DEFAULT_COMMISSION_FLOOR)?,
    );

    let window_days = config.get_int("analysis", "window_days", DEFAULT_WINDOW_DAYS)?;
    let window = Duration::try_days(window_days).ok_or_else(|| {
        RoundtripError::invalid("analysis", "window_days", format!("{window_days} days is out of range"))
    })?;

    Ok(AnalysisConfig {
        window,
        starting_cash: config.get_decimal("analysis", "starting_cash", DEFAULT_STARTING_CASH)?,
        commission,
        include_commission: config.get_bool("analysis", "include_commission", true)?,
        sell_time: parse_time(config, "sell_time", default_sell_time())?,
        buy_time: parse_time(config, "buy_time", default_buy_time())?,
    })
}

/// The analysis clock. A fixed `[analysis] now` makes runs reproducible;
/// otherwise the local wall clock is read once.
pub fn resolve_now(config: &dyn ConfigPort) -> Result<NaiveDateTime, RoundtripError> {
    match config.get_string("analysis", "now") {
        Some(v) if !v.is_empty() => NaiveDateTime::parse_from_str(&v, TIMESTAMP_FORMAT).map_err(|_| {
            RoundtripError::invalid(
                "analysis",
                "now",
                format!("'{v}' is not a timestamp (expected YYYY-MM-DD HH:MM:SS)"),
            )
        }),
        _ => Ok(chrono::Local::now().naive_local()),
    }
}

fn code_list(value: &str, section: &str, key: &str) -> Result<Vec<String>, RoundtripError> {
    parse_codes(value).map_err(|e| RoundtripError::invalid(section, key, e.to_string()))
}

/// Instruments to analyze: `--code` wins over `[universe] codes`, which wins
/// over everything in the store. `[universe] exclude` applies in all cases.
pub fn resolve_instruments(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    code_override: Option<&str>,
) -> Result<Vec<Instrument>, RoundtripError> {
    let include = match code_override {
        Some(codes) => Some(code_list(codes, "universe", "codes")?),
        None => match config.get_string("universe", "codes") {
            Some(codes) if !codes.is_empty() => Some(code_list(&codes, "universe", "codes")?),
            _ => None,
        },
    };
    let exclude = match config.get_string("universe", "exclude") {
        Some(codes) if !codes.is_empty() => code_list(&codes, "universe", "exclude")?,
        _ => Vec::new(),
    };

    let stored = data_port.list_instruments()?;
    Ok(select_instruments(stored, include.as_deref(), &exclude))
}

pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, RoundtripError> {
    validate_data_config(config)?;
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();

    if source == "sqlite" {
        #[cfg(feature = "sqlite")]
        {
            use crate::adapters::sqlite_adapter::SqliteAdapter;

            let adapter = SqliteAdapter::from_config(config)?;
            adapter.initialize_schema()?;
            return Ok(Box::new(adapter));
        }

        #[cfg(not(feature = "sqlite"))]
        {
            return Err(RoundtripError::invalid(
                "data",
                "source",
                "this build has no sqlite support",
            ));
        }
    }

    let dir = config.get_string("data", "csv_dir").unwrap_or_default();
    Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
}

fn print_warnings(warnings: &[ConfigWarning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn run_analyze(config_path: &Path, code: Option<&str>, output: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };

    let config = match build_analysis_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let now = match resolve_now(&adapter) {
        Ok(n) => n,
        Err(e) => return fail(e),
    };
    let data_port = match open_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let instruments = match resolve_instruments(&adapter, data_port.as_ref(), code) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };

    let output_dir = output
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "output_dir").map(PathBuf::from));

    run_analysis_pipeline(
        data_port.as_ref(),
        &instruments,
        &config,
        now,
        output_dir.as_deref(),
    )
}

pub fn run_analysis_pipeline(
    data_port: &dyn DataPort,
    instruments: &[Instrument],
    config: &AnalysisConfig,
    now: NaiveDateTime,
    output_dir: Option<&Path>,
) -> ExitCode {
    if let Err(e) = config.validate() {
        return fail(e);
    }

    if instruments.is_empty() {
        eprintln!("error: no instruments to analyze");
        return ExitCode::from(5);
    }

    eprintln!(
        "Analyzing {} instruments over {} days ending {}",
        instruments.len(),
        config.window.num_days(),
        now.format(TIMESTAMP_FORMAT),
    );

    let report = match analyze_universe(data_port, instruments, config, now) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    print_report(&report);

    if let Some(dir) = output_dir {
        if let Err(e) = CsvReportAdapter.write(&report, dir) {
            return fail(e);
        }
        eprintln!("\nReport written to: {}", dir.display());
    }
    ExitCode::SUCCESS
}

fn print_report(report: &BatchReport) {
    eprintln!("\n=== Per-Instrument Results ===");
    for row in &report.rows {
        let result = &row.result;
        match result.outcome {
            AnalysisOutcome::Completed => println!(
                "{:<12} {:<24} {:>14} {:>4} trades  commission {}",
                row.instrument.code,
                row.instrument.display_name(),
                result.amount.round_dp(2),
                result.transaction_count,
                result.total_commission.round_dp(2),
            ),
            AnalysisOutcome::NoRoundTrip => println!(
                "{:<12} {:<24} no round trip in window",
                row.instrument.code,
                row.instrument.display_name(),
            ),
            AnalysisOutcome::Empty => println!(
                "{:<12} {:<24} no data in window",
                row.instrument.code,
                row.instrument.display_name(),
            ),
        }
    }

    for skipped in &report.skipped {
        eprintln!("warning: skipped {} ({})", skipped.code, skipped.reason);
    }

    let totals = &report.totals;
    let sign = if totals.profit_loss >= rust_decimal::Decimal::ZERO {
        "+"
    } else {
        ""
    };
    eprintln!("\n=== Totals ===");
    eprintln!("Instruments traded: {}", totals.instruments_traded);
    eprintln!("Start:              {}", totals.total_start.round_dp(2));
    eprintln!("End:                {}", totals.total_end.round_dp(2));
    eprintln!("Profit/Loss:        {}{}", sign, totals.profit_loss.round_dp(2));
}

fn run_import(config_path: &Path, code: &str, name: Option<&str>, input: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };
    let data_port = match open_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    eprintln!("Reading bars from {}", input.display());
    let bars = match read_bars_file(input) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };
    if bars.is_empty() {
        return fail(RoundtripError::NoData {
            code: code.to_string(),
        });
    }

    let instrument = Instrument::new(code.trim(), name.unwrap_or_default().trim());
    match data_port.store_bars(&instrument, &bars) {
        Ok(n) => {
            eprintln!("Stored {} bars for {}", n, instrument.code);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_plan(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };
    let now = match resolve_now(&adapter) {
        Ok(n) => n,
        Err(e) => return fail(e),
    };
    let data_port = match open_data_port(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let instruments = match resolve_instruments(&adapter, data_port.as_ref(), None) {
        Ok(i) => i,
        Err(e) => return fail(e),
    };

    for instrument in &instruments {
        let latest = match data_port.latest_timestamp(&instrument.code) {
            Ok(ts) => ts,
            Err(e) => return fail(e),
        };
        let requests: Vec<String> = plan_refresh(latest, now)
            .iter()
            .map(ToString::to_string)
            .collect();
        let latest = latest
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "never".to_string());
        println!("{}\t{}\t{}", instrument.code, latest, requests.join("; "));
    }
    eprintln!("{} instruments planned", instruments.len());
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(exit) => return exit,
    };

    let config = match build_analysis_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let warnings = match config.validate() {
        Ok(w) => w,
        Err(e) => return fail(e),
    };
    if let Err(e) = resolve_now(&adapter) {
        return fail(e);
    }
    if let Err(e) = validate_data_config(&adapter) {
        return fail(e);
    }
    for (section, key) in [("universe", "codes"), ("universe", "exclude")] {
        if let Some(codes) = adapter.get_string(section, key).filter(|c| !c.is_empty()) {
            if let Err(e) = code_list(&codes, section, key) {
                return fail(e);
            }
        }
    }

    print_warnings(&warnings);
    eprintln!("\nAnalysis:");
    eprintln!("  starting cash:  {}", config.starting_cash);
    eprintln!("  window:         {} days", config.window.num_days());
    eprintln!(
        "  commission:     {}% of notional, at least {}",
        config.commission.effective_rate() * rust_decimal::Decimal::ONE_HUNDRED,
        config.commission.floor,
    );
    eprintln!(
        "  sell / buy:     {} / {}",
        config.sell_time.format(TIME_FORMAT),
        config.buy_time.format(TIME_FORMAT),
    );
    eprintln!("\nConfig is valid");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn defaults_when_analysis_section_is_empty() {
        let built = build_analysis_config(&config("[analysis]\n")).unwrap();
        assert_eq!(built, AnalysisConfig::default());
    }

    #[test]
    fn reads_every_analysis_key() {
        let built = build_analysis_config(&config(
            "[analysis]\nstarting_cash = 1000\nwindow_days = 10\ncommission_pct = 0.1\n\
             commission_floor = 0\ninclude_commission = false\nsell_time = 09:30\nbuy_time = 15:45\n",
        ))
        .unwrap();
        assert_eq!(built.starting_cash, dec!(1000));
        assert_eq!(built.window, Duration::days(10));
        assert_eq!(built.commission, CommissionModel::new(dec!(0.1), dec!(0)));
        assert!(!built.include_commission);
        assert_eq!(built.sell_time, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(built.buy_time, NaiveTime::from_hms_opt(15, 45, 0).unwrap());
    }

    #[test]
    fn bad_time_is_config_invalid() {
        let err = build_analysis_config(&config("[analysis]\nsell_time = morning\n")).unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "sell_time"));
    }

    #[test]
    fn absurd_window_is_config_invalid() {
        let err =
            build_analysis_config(&config("[analysis]\nwindow_days = 9223372036854775807\n"))
                .unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "window_days"));
    }

    #[test]
    fn malformed_window_is_config_invalid() {
        let err = build_analysis_config(&config("[analysis]\nwindow_days = 7x\n")).unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "window_days"));
    }

    #[test]
    fn malformed_commission_flag_is_config_invalid() {
        let err = build_analysis_config(&config("[analysis]\ninclude_commission = nope\n"))
            .unwrap_err();
        assert!(
            matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "include_commission")
        );
    }

    #[test]
    fn fixed_now_is_used() {
        let now = resolve_now(&config("[analysis]\nnow = 2024-03-10 16:00:00\n")).unwrap();
        assert_eq!(now.format(TIMESTAMP_FORMAT).to_string(), "2024-03-10 16:00:00");
    }

    #[test]
    fn bad_now_is_config_invalid() {
        let err = resolve_now(&config("[analysis]\nnow = yesterday\n")).unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "now"));
    }

    #[test]
    fn unknown_source_is_rejected() {
        let result = open_data_port(&config("[data]\nsource = postgres\n"));
        assert!(matches!(result, Err(RoundtripError::ConfigInvalid { .. })));
    }
}
