//! Decide how much fresh data an acquisition job should request.
//!
//! The acquisition job itself lives outside this crate; it only needs to
//! know, per instrument, which (interval, range) requests to issue given
//! how recent the stored data is.

use chrono::{Duration, NaiveDateTime};
use std::fmt;

/// Data older than this triggers a full backfill.
pub const STALE_AFTER_DAYS: i64 = 30;
/// Data older than this, but not stale, triggers a one-minute refresh.
pub const OUTDATED_AFTER_DAYS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub interval: &'static str,
    pub range: &'static str,
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interval={} range={}", self.interval, self.range)
    }
}

const fn request(interval: &'static str, range: &'static str) -> FetchRequest {
    FetchRequest { interval, range }
}

/// Coarse history first, then progressively finer recent bars.
pub const BACKFILL: [FetchRequest; 3] = [
    request("1h", "2y"),
    request("5m", "1mo"),
    request("1m", "8d"),
];
pub const CATCH_UP: [FetchRequest; 1] = [request("1m", "8d")];
pub const TOP_UP: [FetchRequest; 1] = [request("1m", "1d")];

pub fn plan_refresh(latest: Option<NaiveDateTime>, now: NaiveDateTime) -> &'static [FetchRequest] {
    let older_than = |days: i64| match (latest, now.checked_sub_signed(Duration::days(days))) {
        (None, _) => true,
        (Some(ts), Some(limit)) => ts < limit,
        (Some(_), None) => false,
    };

    if older_than(STALE_AFTER_DAYS) {
        &BACKFILL
    } else if older_than(OUTDATED_AFTER_DAYS) {
        &CATCH_UP
    } else {
        &TOP_UP
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn no_data_means_backfill() {
        assert_eq!(plan_refresh(None, at("2024-03-10 12:00:00")), &BACKFILL);
    }

    #[test]
    fn stale_data_means_backfill() {
        let plan = plan_refresh(Some(at("2024-01-01 12:00:00")), at("2024-03-10 12:00:00"));
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], request("1h", "2y"));
    }

    #[test]
    fn few_days_old_means_catch_up() {
        let plan = plan_refresh(Some(at("2024-03-05 12:00:00")), at("2024-03-10 12:00:00"));
        assert_eq!(plan, &CATCH_UP);
    }

    #[test]
    fn fresh_data_means_top_up() {
        let plan = plan_refresh(Some(at("2024-03-10 09:00:00")), at("2024-03-10 12:00:00"));
        assert_eq!(plan, &TOP_UP);
    }

    #[test]
    fn boundary_is_not_stale() {
        let plan = plan_refresh(Some(at("2024-02-09 12:00:00")), at("2024-03-10 12:00:00"));
        assert_eq!(plan, &CATCH_UP);
    }

    #[test]
    fn display() {
        assert_eq!(TOP_UP[0].to_string(), "interval=1m range=1d");
    }
}
