//! CSV directory data adapter.
//!
//! Layout: `instruments.csv` (`code,friendly_name`) plus one `<code>.csv`
//! per instrument with header `timestamp,open,high,low,close,volume`.
//! Empty cells are missing prints.

use crate::adapters::csv_report_adapter::{DAILY_SUFFIX, SUMMARY_FILE};
use crate::domain::error::RoundtripError;
use crate::domain::instrument::Instrument;
use crate::domain::price_bar::PriceBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const INSTRUMENTS_FILE: &str = "instruments.csv";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const BAR_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

fn format_error(source_name: &str, reason: impl Into<String>) -> RoundtripError {
    RoundtripError::DataFormat {
        source_name: source_name.to_string(),
        reason: reason.into(),
    }
}

/// Accepts `YYYY-MM-DD HH:MM:SS` and the ISO `T` separator.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn optional_decimal(
    value: Option<&str>,
    column: &str,
    source_name: &str,
) -> Result<Option<Decimal>, RoundtripError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => Decimal::from_str(v)
            .map(Some)
            .map_err(|e| format_error(source_name, format!("invalid {column} value '{v}': {e}"))),
    }
}

fn optional_volume(value: Option<&str>, source_name: &str) -> Result<Option<i64>, RoundtripError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e| format_error(source_name, format!("invalid volume value '{v}': {e}"))),
    }
}

/// Parse a bar file. Rows come back in timestamp order.
pub fn parse_bars(content: &str, source_name: &str) -> Result<Vec<PriceBar>, RoundtripError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for result in rdr.records() {
        let record =
            result.map_err(|e| format_error(source_name, format!("CSV parse error: {e}")))?;

        let ts_str = record
            .get(0)
            .ok_or_else(|| format_error(source_name, "missing timestamp column"))?;
        let timestamp = parse_timestamp(ts_str)
            .ok_or_else(|| format_error(source_name, format!("invalid timestamp '{ts_str}'")))?;

        bars.push(PriceBar {
            timestamp,
            open: optional_decimal(record.get(1), "open", source_name)?,
            high: optional_decimal(record.get(2), "high", source_name)?,
            low: optional_decimal(record.get(3), "low", source_name)?,
            close: optional_decimal(record.get(4), "close", source_name)?,
            volume: optional_volume(record.get(5), source_name)?,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Read a standalone bar file, e.g. one handed over by an acquisition job.
pub fn read_bars_file(path: &Path) -> Result<Vec<PriceBar>, RoundtripError> {
    let content = fs::read_to_string(path)?;
    parse_bars(&content, &path.display().to_string())
}

fn fmt_opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn bars_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn instruments_path(&self) -> PathBuf {
        self.base_path.join(INSTRUMENTS_FILE)
    }

    fn read_instrument_file(&self) -> Result<Vec<Instrument>, RoundtripError> {
        let path = self.instruments_path();
        let source_name = path.display().to_string();
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|e| format_error(&source_name, e.to_string()))?;

        let mut instruments = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| format_error(&source_name, format!("CSV parse error: {e}")))?;
            let code = record
                .get(0)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| format_error(&source_name, "missing code column"))?;
            let name = record.get(1).map(str::trim).unwrap_or_default();
            instruments.push(Instrument::new(code, name));
        }
        Ok(instruments)
    }

    fn write_instrument_file(&self, instruments: &[Instrument]) -> Result<(), RoundtripError> {
        let path = self.instruments_path();
        let source_name = path.display().to_string();
        let mut wtr =
            csv::Writer::from_path(&path).map_err(|e| format_error(&source_name, e.to_string()))?;
        wtr.write_record(["code", "friendly_name"])
            .map_err(|e| format_error(&source_name, e.to_string()))?;
        for instrument in instruments {
            wtr.write_record([&instrument.code, &instrument.friendly_name])
                .map_err(|e| format_error(&source_name, e.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_bar_file(&self, code: &str, bars: &[PriceBar]) -> Result<(), RoundtripError> {
        let path = self.bars_path(code);
        let source_name = path.display().to_string();
        let mut wtr =
            csv::Writer::from_path(&path).map_err(|e| format_error(&source_name, e.to_string()))?;
        wtr.write_record(BAR_HEADER)
            .map_err(|e| format_error(&source_name, e.to_string()))?;

        for bar in bars {
            wtr.write_record([
                bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                fmt_opt(bar.open),
                fmt_opt(bar.high),
                fmt_opt(bar.low),
                fmt_opt(bar.close),
                fmt_opt(bar.volume),
            ])
            .map_err(|e| format_error(&source_name, e.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn ensure_instrument(&self, instrument: &Instrument) -> Result<(), RoundtripError> {
        let mut instruments = self.list_instruments()?;

        match instruments.iter().position(|i| i.code == instrument.code) {
            Some(idx) => {
                let existing = &mut instruments[idx];
                if instrument.friendly_name.is_empty()
                    || existing.friendly_name == instrument.friendly_name
                {
                    if self.instruments_path().exists() {
                        return Ok(());
                    }
                } else {
                    existing.friendly_name = instrument.friendly_name.clone();
                }
            }
            None => instruments.push(instrument.clone()),
        }
        self.write_instrument_file(&instruments)
    }
}

impl DataPort for CsvAdapter {
    /// `instruments.csv` when present, otherwise every `*.csv` file stem.
    fn list_instruments(&self) -> Result<Vec<Instrument>, RoundtripError> {
        if self.instruments_path().exists() {
            return self.read_instrument_file();
        }

        let entries = fs::read_dir(&self.base_path).map_err(|e| RoundtripError::Database {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            // reports may be written into the store directory
            if name_str == SUMMARY_FILE || name_str.ends_with(DAILY_SUFFIX) {
                continue;
            }
            if let Some(code) = name_str.strip_suffix(".csv") {
                codes.push(code.to_string());
            }
        }

        codes.sort();
        Ok(codes.into_iter().map(|c| Instrument::new(c, "")).collect())
    }

    fn fetch_bars(
        &self,
        code: &str,
        since: Option<NaiveDateTime>,
    ) -> Result<Vec<PriceBar>, RoundtripError> {
        let path = self.bars_path(code);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut bars = read_bars_file(&path)?;
        if let Some(cutoff) = since {
            bars.retain(|b| b.timestamp >= cutoff);
        }
        Ok(bars)
    }

    fn latest_timestamp(&self, code: &str) -> Result<Option<NaiveDateTime>, RoundtripError> {
        let bars = self.fetch_bars(code, None)?;
        Ok(bars.last().map(|b| b.timestamp))
    }

    fn store_bars(
        &self,
        instrument: &Instrument,
        bars: &[PriceBar],
    ) -> Result<usize, RoundtripError> {
        fs::create_dir_all(&self.base_path)?;
        self.ensure_instrument(instrument)?;

        let mut merged: BTreeMap<NaiveDateTime, PriceBar> = self
            .fetch_bars(&instrument.code, None)?
            .into_iter()
            .map(|b| (b.timestamp, b))
            .collect();
        for bar in bars {
            merged.insert(bar.timestamp, bar.clone());
        }

        let all: Vec<PriceBar> = merged.into_values().collect();
        self.write_bar_file(&instrument.code, &all)?;
        Ok(bars.len())
    }
}
