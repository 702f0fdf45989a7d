//! Price-at-time lookup within one session.
//!
//! The lookup picks the earliest bar at or after the target time, never the
//! nearest one, so sparse or irregular sampling still resolves to a price.

use chrono::NaiveTime;
use rust_decimal::Decimal;

use super::price_bar::{PriceBar, PriceField};
use super::session::TradingSession;

/// First bar whose time of day is `>= target`.
///
/// Does not assume the session is sorted.
pub fn bar_at_or_after(session: &TradingSession, target: NaiveTime) -> Option<&PriceBar> {
    session
        .bars
        .iter()
        .filter(|b| b.time() >= target)
        .min_by_key(|b| b.time())
}

/// The requested print of the first bar at or after `target`.
///
/// If that bar lacks the field the result is `None`; later bars are not
/// consulted.
pub fn locate_price(
    session: &TradingSession,
    target: NaiveTime,
    field: PriceField,
) -> Option<Decimal> {
    bar_at_or_after(session, target).and_then(|bar| bar.price(field))
}
