//! Analysis across many instruments.
//!
//! Bars are loaded one instrument at a time through the data port, then the
//! independent simulations run in parallel. Each run owns its portfolio, so
//! nothing is shared between threads.

use chrono::NaiveDateTime;
use log::warn;
use rayon::prelude::*;
use rust_decimal::Decimal;

use super::error::RoundtripError;
use super::instrument::Instrument;
use super::result::{AnalysisOutcome, AnalysisResult};
use super::session::window_cutoff;
use super::simulation::{AnalysisConfig, analyze};
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub instrument: Instrument,
    pub bar_count: usize,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchTotals {
    /// Instruments whose run completed at least one round trip.
    pub instruments_traded: usize,
    pub total_start: Decimal,
    pub total_end: Decimal,
    pub profit_loss: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub rows: Vec<InstrumentReport>,
    pub skipped: Vec<SkippedInstrument>,
    pub totals: BatchTotals,
}

impl BatchReport {
    pub fn unliquidated(&self) -> impl Iterator<Item = &InstrumentReport> {
        self.rows.iter().filter(|r| r.result.has_unliquidated_shares())
    }
}

pub fn compute_totals(rows: &[InstrumentReport], starting_cash: Decimal) -> BatchTotals {
    let traded: Vec<&InstrumentReport> = rows
        .iter()
        .filter(|r| r.result.outcome == AnalysisOutcome::Completed)
        .collect();

    let total_start = starting_cash * Decimal::from(traded.len());
    let total_end: Decimal = traded.iter().map(|r| r.result.amount).sum();

    BatchTotals {
        instruments_traded: traded.len(),
        total_start,
        total_end,
        profit_loss: total_end - total_start,
    }
}

/// Analyze every instrument as of `now`.
///
/// Configuration errors abort the batch. Instruments whose bars cannot be
/// loaded are skipped with a reason.
pub fn analyze_universe(
    data_port: &dyn DataPort,
    instruments: &[Instrument],
    config: &AnalysisConfig,
    now: NaiveDateTime,
) -> Result<BatchReport, RoundtripError> {
    for warning in config.validate()? {
        warn!("{warning}");
    }
    let since = Some(window_cutoff(now, config.window));

    let mut loaded = Vec::with_capacity(instruments.len());
    let mut skipped = Vec::new();
    for instrument in instruments {
        match data_port.fetch_bars(&instrument.code, since) {
            Ok(bars) => loaded.push((instrument.clone(), bars)),
            Err(e) => {
                warn!("skipping {} ({})", instrument.code, e);
                skipped.push(SkippedInstrument {
                    code: instrument.code.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let rows = loaded
        .into_par_iter()
        .map(|(instrument, bars)| {
            let result = analyze(&bars, config, now)?;
            Ok(InstrumentReport {
                instrument,
                bar_count: bars.len(),
                result,
            })
        })
        .collect::<Result<Vec<_>, RoundtripError>>()?;

    let totals = compute_totals(&rows, config.starting_cash);
    let report = BatchReport {
        rows,
        skipped,
        totals,
    };
    for row in report.unliquidated() {
        warn!(
            "{}: {} shares were never liquidated; their value is not included in the amount",
            row.instrument.code, row.result.residual_shares
        );
    }
    Ok(report)
}
