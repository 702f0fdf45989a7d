//! Sell-at-open, rebuy-at-close simulation over one instrument's bars.
//!
//! Run structure:
//! 1. Group bars into sessions inside the trailing window ending at `now`
//! 2. Initial purchase on the first session
//! 3. One round trip per later session when both reference prices exist
//! 4. Liquidate leftovers at the last sell-reference price
//! 5. Assemble the reported result
//!
//! `now` is always supplied by the caller, so identical inputs give
//! identical results.

use chrono::{Duration, NaiveDateTime, NaiveTime};
use log::info;
use rust_decimal::Decimal;

use super::commission::CommissionModel;
use super::config_validation::{ConfigWarning, validate_analysis_config};
use super::error::RoundtripError;
use super::portfolio::Portfolio;
use super::price_bar::PriceBar;
use super::result::{AnalysisResult, DailyResult, aggregate};
use super::session::{TradingSession, group_sessions};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_STARTING_CASH: Decimal = Decimal::ONE_HUNDRED;

pub fn default_sell_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

pub fn default_buy_time() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub window: Duration,
    pub starting_cash: Decimal,
    pub commission: CommissionModel,
    /// Subtract accrued commission from the reported amount.
    pub include_commission: bool,
    /// Morning reference time; the opening print here is the sell price.
    pub sell_time: NaiveTime,
    /// Afternoon reference time; the closing print here is the buy price.
    pub buy_time: NaiveTime,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            window: Duration::days(DEFAULT_WINDOW_DAYS),
            starting_cash: DEFAULT_STARTING_CASH,
            commission: CommissionModel::default(),
            include_commission: true,
            sell_time: default_sell_time(),
            buy_time: default_buy_time(),
        }
    }
}

impl AnalysisConfig {
    /// Reject configurations that cannot be simulated. Suspicious but usable
    /// values come back as warnings.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, RoundtripError> {
        validate_analysis_config(self)
    }
}

/// Backtest the rule over `bars` as of `now`.
///
/// Fails only on invalid configuration. Missing data produces an
/// [`AnalysisResult`] with the matching outcome instead.
pub fn analyze(
    bars: &[PriceBar],
    config: &AnalysisConfig,
    now: NaiveDateTime,
) -> Result<AnalysisResult, RoundtripError> {
    config.validate()?;
    let sessions = group_sessions(bars, config.window, now);
    Ok(simulate_sessions(&sessions, config))
}

/// Run the state machine over sessions already grouped and ordered.
pub fn simulate_sessions(sessions: &[TradingSession], config: &AnalysisConfig) -> AnalysisResult {
    let Some((first, rest)) = sessions.split_first() else {
        return AnalysisResult::empty();
    };
    let Some(opened) = Portfolio::open(first, config.starting_cash, config) else {
        return AnalysisResult::empty();
    };

    let (walked, daily_results) = rest.iter().fold(
        (opened, Vec::<DailyResult>::new()),
        |(portfolio, mut trace), session| {
            let (next, day) = portfolio.step(session, config);
            trace.extend(day);
            (next, trace)
        },
    );

    let finalized = walked.finalize(config);
    let result = aggregate(&finalized, daily_results, config.include_commission);

    info!(
        "simulated {} sessions: {} round trips, {} transactions, amount {}",
        sessions.len(),
        result.round_trips(),
        result.transaction_count,
        result.amount
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::AnalysisOutcome;
    use rust_decimal_macros::dec;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn bar(date: &str, time: &str, open: Decimal, close: Decimal) -> PriceBar {
        PriceBar {
            timestamp: at(date, time),
            open: Some(open),
            high: None,
            low: None,
            close: Some(close),
            volume: Some(100),
        }
    }

    fn config(starting_cash: Decimal) -> AnalysisConfig {
        AnalysisConfig {
            starting_cash,
            ..AnalysisConfig::default()
        }
    }

    fn now() -> NaiveDateTime {
        at("2024-03-10", "18:00:00")
    }

    #[test]
    fn defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.window, Duration::days(30));
        assert_eq!(c.starting_cash, dec!(100));
        assert!(c.include_commission);
        assert_eq!(c.sell_time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(c.buy_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    }

    #[test]
    fn no_bars_is_empty() {
        let r = analyze(&[], &config(dec!(1000)), now()).unwrap();
        assert_eq!(r, AnalysisResult::empty());
    }

    #[test]
    fn first_session_without_morning_price_is_empty() {
        let bars = vec![
            bar("2024-03-04", "07:00:00", dec!(100), dec!(100)),
            bar("2024-03-05", "08:00:00", dec!(110), dec!(110)),
            bar("2024-03-05", "14:00:00", dec!(105), dec!(105)),
        ];
        let r = analyze(&bars, &config(dec!(1000)), now()).unwrap();
        assert_eq!(r.outcome, AnalysisOutcome::Empty);
        assert_eq!(r.transaction_count, 0);
    }

    #[test]
    fn two_session_round_trip_then_liquidation() {
        let bars = vec![
            bar("2024-03-04", "08:00:00", dec!(100), dec!(100)),
            bar("2024-03-05", "08:00:00", dec!(110), dec!(110)),
            bar("2024-03-05", "14:00:00", dec!(105), dec!(105)),
        ];
        let r = analyze(&bars, &config(dec!(1000)), now()).unwrap();

        assert_eq!(r.outcome, AnalysisOutcome::Completed);
        assert_eq!(r.transaction_count, 4);
        assert_eq!(r.final_cash, dec!(1150));
        assert_eq!(r.residual_shares, 0);
        assert_eq!(r.daily_results.len(), 1);
        assert_eq!(r.daily_results[0].profit_or_loss, dec!(50));
        assert_eq!(r.daily_results[0].cash, dec!(50));
        assert_eq!(r.daily_results[0].shares, 10);
        // two legs plus the liquidation, each at the 25 floor
        assert_eq!(r.total_commission, dec!(75));
        assert_eq!(r.amount, dec!(1075));
    }

    #[test]
    fn invalid_config_fails_before_simulating() {
        let err = analyze(&[], &config(Decimal::ZERO), now()).unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { .. }));
    }

    #[test]
    fn huge_prices_with_steep_commission_do_not_panic() {
        let price = dec!(30000000000000000000000000000);
        let c = AnalysisConfig {
            starting_cash: price,
            commission: CommissionModel::new(dec!(200), dec!(25)),
            ..AnalysisConfig::default()
        };
        assert!(c.validate().is_ok());

        let bars = vec![
            bar("2024-03-04", "08:00:00", price, price),
            bar("2024-03-05", "08:00:00", price, price),
            bar("2024-03-05", "14:00:00", price, price),
        ];
        let r = analyze(&bars, &c, now()).unwrap();
        // the round trip is skipped; only the buy and the liquidation remain
        assert!(r.daily_results.is_empty());
        assert_eq!(r.transaction_count, 2);
        assert_eq!(r.final_cash, price);
        assert_eq!(r.residual_shares, 0);
    }

    #[test]
    fn custom_reference_times() {
        let c = AnalysisConfig {
            starting_cash: dec!(1000),
            sell_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            buy_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            ..AnalysisConfig::default()
        };
        let bars = vec![
            bar("2024-03-04", "09:00:00", dec!(100), dec!(100)),
            bar("2024-03-05", "08:00:00", dec!(1), dec!(1)),
            bar("2024-03-05", "09:00:00", dec!(110), dec!(110)),
            bar("2024-03-05", "14:00:00", dec!(1), dec!(1)),
            bar("2024-03-05", "16:00:00", dec!(105), dec!(105)),
        ];
        let r = analyze(&bars, &c, now()).unwrap();
        assert_eq!(r.daily_results[0].profit_or_loss, dec!(50));
        assert_eq!(r.final_cash, dec!(1150));
    }
}
