//! Calendar-day sessions within a trailing window.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use super::price_bar::PriceBar;

/// All bars observed on one calendar date, ordered by time of day.
#[derive(Debug, Clone, PartialEq)]
pub struct TradingSession {
    pub date: NaiveDate,
    pub bars: Vec<PriceBar>,
}

impl TradingSession {
    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }
}

/// Earliest timestamp kept for a window ending at `now`.
pub fn window_cutoff(now: NaiveDateTime, window: Duration) -> NaiveDateTime {
    now.checked_sub_signed(window).unwrap_or(NaiveDateTime::MIN)
}

/// Partition `bars` into sessions for every date with at least one bar at
/// or after `now - window`. Sessions come back in date order and each
/// session's bars in time-of-day order; bars sharing a timestamp keep their
/// input order.
pub fn group_sessions(
    bars: &[PriceBar],
    window: Duration,
    now: NaiveDateTime,
) -> Vec<TradingSession> {
    let cutoff = window_cutoff(now, window);

    let mut by_date: BTreeMap<NaiveDate, Vec<PriceBar>> = BTreeMap::new();
    for bar in bars.iter().filter(|b| b.timestamp >= cutoff) {
        by_date.entry(bar.date()).or_default().push(bar.clone());
    }

    by_date
        .into_iter()
        .map(|(date, mut bars)| {
            bars.sort_by_key(|b| b.time());
            TradingSession { date, bars }
        })
        .collect()
}
