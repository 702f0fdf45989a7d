//! Simulation output types and the final assembly step.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::portfolio::Portfolio;

/// One day on which a full sell and rebuy executed.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyResult {
    pub date: NaiveDate,
    /// sell amount - rebuy amount
    pub profit_or_loss: Decimal,
    /// Cash after the rebuy.
    pub cash: Decimal,
    /// Shares held after the rebuy.
    pub shares: u64,
    pub commission: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// No session in the window, or no opening price on the first session.
    Empty,
    /// Only the initial purchase happened.
    NoRoundTrip,
    Completed,
}

impl AnalysisOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisOutcome::Empty => "empty",
            AnalysisOutcome::NoRoundTrip => "no_round_trip",
            AnalysisOutcome::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub outcome: AnalysisOutcome,
    pub amount: Decimal,
    pub transaction_count: u32,
    pub total_commission: Decimal,
    pub daily_results: Vec<DailyResult>,
    /// Cash at the end of the walk, before any commission is deducted.
    pub final_cash: Decimal,
    /// Shares still held after finalization. Non-zero only when no
    /// sell-reference price was ever observed; their value is not part of
    /// `amount`.
    pub residual_shares: u64,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        AnalysisResult {
            outcome: AnalysisOutcome::Empty,
            amount: Decimal::ZERO,
            transaction_count: 0,
            total_commission: Decimal::ZERO,
            daily_results: Vec::new(),
            final_cash: Decimal::ZERO,
            residual_shares: 0,
        }
    }

    pub fn has_unliquidated_shares(&self) -> bool {
        self.residual_shares > 0
    }

    pub fn round_trips(&self) -> usize {
        self.daily_results.len()
    }
}

/// Package a finalized portfolio and its trace into the reported summary.
///
/// Commission is subtracted from the final cash exactly once, and only when
/// `include_commission` is set. A run that never got past the initial
/// purchase reports a zero amount.
pub fn aggregate(
    portfolio: &Portfolio,
    daily_results: Vec<DailyResult>,
    include_commission: bool,
) -> AnalysisResult {
    if portfolio.transaction_count <= 1 {
        return AnalysisResult {
            outcome: AnalysisOutcome::NoRoundTrip,
            amount: Decimal::ZERO,
            transaction_count: portfolio.transaction_count,
            total_commission: Decimal::ZERO,
            daily_results,
            final_cash: portfolio.cash,
            residual_shares: portfolio.shares,
        };
    }

    let amount = if include_commission {
        portfolio.cash - portfolio.total_commission
    } else {
        portfolio.cash
    };

    AnalysisResult {
        outcome: AnalysisOutcome::Completed,
        amount,
        transaction_count: portfolio.transaction_count,
        total_commission: portfolio.total_commission,
        daily_results,
        final_cash: portfolio.cash,
        residual_shares: portfolio.shares,
    }
}
