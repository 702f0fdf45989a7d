#![allow(dead_code)]

use chrono::NaiveDateTime;
use roundtrip::domain::error::RoundtripError;
use roundtrip::domain::instrument::Instrument;
pub use roundtrip::domain::price_bar::PriceBar;
use roundtrip::ports::data_port::DataPort;
use rust_decimal::Decimal;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub instruments: Vec<Instrument>,
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
    pub stored: RefCell<Vec<(Instrument, usize)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            instruments: Vec::new(),
            data: HashMap::new(),
            errors: HashMap::new(),
            stored: RefCell::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.instruments.push(Instrument::new(code, ""));
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.instruments.push(Instrument::new(code, ""));
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn list_instruments(&self) -> Result<Vec<Instrument>, RoundtripError> {
        Ok(self.instruments.clone())
    }

    fn fetch_bars(
        &self,
        code: &str,
        since: Option<NaiveDateTime>,
    ) -> Result<Vec<PriceBar>, RoundtripError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(RoundtripError::Database {
                reason: reason.clone(),
            });
        }
        let mut bars = self.data.get(code).cloned().unwrap_or_default();
        if let Some(cutoff) = since {
            bars.retain(|b| b.timestamp >= cutoff);
        }
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    fn latest_timestamp(&self, code: &str) -> Result<Option<NaiveDateTime>, RoundtripError> {
        Ok(self.fetch_bars(code, None)?.last().map(|b| b.timestamp))
    }

    fn store_bars(
        &self,
        instrument: &Instrument,
        bars: &[PriceBar],
    ) -> Result<usize, RoundtripError> {
        self.stored
            .borrow_mut()
            .push((instrument.clone(), bars.len()));
        Ok(bars.len())
    }
}

pub fn at(date: &str, time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn make_bar(date: &str, time: &str, open: Option<Decimal>, close: Option<Decimal>) -> PriceBar {
    PriceBar {
        timestamp: at(date, time),
        open,
        high: None,
        low: None,
        close,
        volume: Some(1_000),
    }
}

/// A session with a morning print at 08:00 and an afternoon print at 14:00.
pub fn session_bars(date: &str, open: Decimal, close: Decimal) -> Vec<PriceBar> {
    vec![
        make_bar(date, "08:00:00", Some(open), Some(open)),
        make_bar(date, "14:00:00", Some(close), Some(close)),
    ]
}

/// The two-session example: buy 10 at 100, sell at 110, rebuy 10 at 105.
pub fn two_session_bars() -> Vec<PriceBar> {
    let mut bars = vec![make_bar(
        "2024-03-04",
        "08:00:00",
        Some(Decimal::ONE_HUNDRED),
        None,
    )];
    bars.extend(session_bars(
        "2024-03-05",
        Decimal::from(110),
        Decimal::from(105),
    ));
    bars
}

pub fn now() -> NaiveDateTime {
    at("2024-03-10", "16:00:00")
}
