//! Price-bar persistence port.

use crate::domain::error::RoundtripError;
use crate::domain::instrument::Instrument;
use crate::domain::price_bar::PriceBar;
use chrono::NaiveDateTime;

pub trait DataPort {
    fn list_instruments(&self) -> Result<Vec<Instrument>, RoundtripError>;

    /// Bars for `code` in timestamp order, optionally only those at or after
    /// `since`. An unknown code yields an empty list.
    fn fetch_bars(
        &self,
        code: &str,
        since: Option<NaiveDateTime>,
    ) -> Result<Vec<PriceBar>, RoundtripError>;

    /// Timestamp of the most recent stored bar, used to size refresh
    /// requests.
    fn latest_timestamp(&self, code: &str) -> Result<Option<NaiveDateTime>, RoundtripError>;

    /// Register `instrument` if needed, then upsert `bars` keyed by
    /// (instrument, timestamp). Returns the number of bars written.
    fn store_bars(&self, instrument: &Instrument, bars: &[PriceBar])
    -> Result<usize, RoundtripError>;
}
