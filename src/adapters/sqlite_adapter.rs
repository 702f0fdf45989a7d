//! SQLite data adapter.
//!
//! Prices are stored as TEXT so decimal values survive the round trip
//! unchanged; timestamps use `YYYY-MM-DD HH:MM:SS`, which sorts
//! chronologically.

use crate::adapters::csv_adapter::TIMESTAMP_FORMAT;
use crate::domain::error::RoundtripError;
use crate::domain::instrument::Instrument;
use crate::domain::price_bar::PriceBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use rust_decimal::Decimal;
use std::str::FromStr;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> RoundtripError {
    RoundtripError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> RoundtripError {
    RoundtripError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn conversion_failure(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}

fn decimal_column(row: &rusqlite::Row<'_>, column: usize) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| Decimal::from_str(&t).map_err(|e| conversion_failure(column, e)))
        .transpose()
}

fn timestamp_column(row: &rusqlite::Row<'_>, column: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(column)?;
    NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(|e| conversion_failure(column, e))
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, RoundtripError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| RoundtripError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let requested = config.get_int("sqlite", "pool_size", 4)?;
        let pool_size = u32::try_from(requested)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                RoundtripError::invalid(
                    "sqlite",
                    "pool_size",
                    format!("{requested} is not a connection count between 1 and {}", u32::MAX),
                )
            })?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, RoundtripError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, RoundtripError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), RoundtripError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS instruments (
                code TEXT PRIMARY KEY,
                friendly_name TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS price_bars (
                code TEXT NOT NULL REFERENCES instruments(code),
                timestamp TEXT NOT NULL,
                open TEXT,
                high TEXT,
                low TEXT,
                close TEXT,
                volume INTEGER,
                PRIMARY KEY (code, timestamp)
            );
            CREATE INDEX IF NOT EXISTS idx_price_bars_timestamp ON price_bars(timestamp);",
        )
        .map_err(query_err)?;

        Ok(())
    }
}

impl DataPort for SqliteAdapter {
    fn list_instruments(&self) -> Result<Vec<Instrument>, RoundtripError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT code, friendly_name FROM instruments ORDER BY code")
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| Ok(Instrument::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(query_err)?;

        let mut instruments = Vec::new();
        for row in rows {
            instruments.push(row.map_err(query_err)?);
        }
        Ok(instruments)
    }

    fn fetch_bars(
        &self,
        code: &str,
        since: Option<NaiveDateTime>,
    ) -> Result<Vec<PriceBar>, RoundtripError> {
        let conn = self.conn()?;

        // An absent bound selects everything: every stored timestamp sorts
        // after the empty string.
        let since_str = since
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();

        let query = "SELECT timestamp, open, high, low, close, volume
                     FROM price_bars
                     WHERE code = ?1 AND timestamp >= ?2
                     ORDER BY timestamp ASC";

        let mut stmt = conn.prepare(query).map_err(query_err)?;

        let rows = stmt
            .query_map(params![code, since_str], |row| {
                Ok(PriceBar {
                    timestamp: timestamp_column(row, 0)?,
                    open: decimal_column(row, 1)?,
                    high: decimal_column(row, 2)?,
                    low: decimal_column(row, 3)?,
                    close: decimal_column(row, 4)?,
                    volume: row.get(5)?,
                })
            })
            .map_err(query_err)?;

        let mut bars = Vec::new();
        for row in rows {
            bars.push(row.map_err(query_err)?);
        }

        Ok(bars)
    }

    fn latest_timestamp(&self, code: &str) -> Result<Option<NaiveDateTime>, RoundtripError> {
        let conn = self.conn()?;

        let latest: Option<String> = conn
            .query_row(
                "SELECT MAX(timestamp) FROM price_bars WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .map_err(query_err)?;

        latest
            .map(|text| {
                NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(|e| {
                    RoundtripError::Database {
                        reason: format!("invalid stored timestamp '{text}': {e}"),
                    }
                })
            })
            .transpose()
    }

    fn store_bars(
        &self,
        instrument: &Instrument,
        bars: &[PriceBar],
    ) -> Result<usize, RoundtripError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute(
            "INSERT INTO instruments (code, friendly_name) VALUES (?1, ?2)
             ON CONFLICT(code) DO UPDATE SET
                friendly_name = CASE WHEN excluded.friendly_name = ''
                                     THEN instruments.friendly_name
                                     ELSE excluded.friendly_name END,
                updated_at = CURRENT_TIMESTAMP",
            params![instrument.code, instrument.friendly_name],
        )
        .map_err(query_err)?;

        for bar in bars {
            tx.execute(
                "INSERT INTO price_bars (code, timestamp, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(code, timestamp) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume",
                params![
                    instrument.code,
                    bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    bar.open.map(|d| d.to_string()),
                    bar.high.map(|d| d.to_string()),
                    bar.low.map(|d| d.to_string()),
                    bar.close.map(|d| d.to_string()),
                    bar.volume
                ],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;

        Ok(bars.len())
    }
}
