//! CSV report adapter implementing ReportPort.
//!
//! Writes `summary.csv` with one row per analyzed instrument plus a
//! `<code>_daily.csv` file for every instrument that produced daily rows.

use std::fs;
use std::path::Path;

use crate::domain::batch::{BatchReport, InstrumentReport};
use crate::domain::error::RoundtripError;
use crate::ports::report_port::ReportPort;

pub const SUMMARY_FILE: &str = "summary.csv";
pub const DAILY_SUFFIX: &str = "_daily.csv";

const SUMMARY_HEADER: [&str; 9] = [
    "code",
    "friendly_name",
    "outcome",
    "amount",
    "transactions",
    "commission",
    "final_cash",
    "residual_shares",
    "bars",
];

const DAILY_HEADER: [&str; 5] = ["date", "profit_or_loss", "cash", "shares", "commission"];

pub struct CsvReportAdapter;

/// File name for an instrument's daily rows. Path separators in a code are
/// replaced so every file lands directly in the output directory.
pub fn daily_file_name(code: &str) -> String {
    let safe: String = code
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}{DAILY_SUFFIX}")
}

fn write_error(path: &Path, e: csv::Error) -> RoundtripError {
    RoundtripError::DataFormat {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    }
}

impl CsvReportAdapter {
    fn write_summary(&self, report: &BatchReport, path: &Path) -> Result<(), RoundtripError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
        wtr.write_record(SUMMARY_HEADER)
            .map_err(|e| write_error(path, e))?;

        for row in &report.rows {
            let result = &row.result;
            wtr.write_record([
                row.instrument.code.clone(),
                row.instrument.friendly_name.clone(),
                result.outcome.as_str().to_string(),
                result.amount.to_string(),
                result.transaction_count.to_string(),
                result.total_commission.to_string(),
                result.final_cash.to_string(),
                result.residual_shares.to_string(),
                row.bar_count.to_string(),
            ])
            .map_err(|e| write_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_daily(&self, row: &InstrumentReport, path: &Path) -> Result<(), RoundtripError> {
        let mut wtr = csv::Writer::from_path(path).map_err(|e| write_error(path, e))?;
        wtr.write_record(DAILY_HEADER)
            .map_err(|e| write_error(path, e))?;

        for day in &row.result.daily_results {
            wtr.write_record([
                day.date.format("%Y-%m-%d").to_string(),
                day.profit_or_loss.to_string(),
                day.cash.to_string(),
                day.shares.to_string(),
                day.commission.to_string(),
            ])
            .map_err(|e| write_error(path, e))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &BatchReport, output_dir: &Path) -> Result<(), RoundtripError> {
        fs::create_dir_all(output_dir)?;
        self.write_summary(report, &output_dir.join(SUMMARY_FILE))?;

        for row in report
            .rows
            .iter()
            .filter(|r| !r.result.daily_results.is_empty())
        {
            let path = output_dir.join(daily_file_name(&row.instrument.code));
            self.write_daily(row, &path)?;
        }
        Ok(())
    }
}
