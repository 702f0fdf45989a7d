//! Configuration access port trait.
//!
//! Adapters supply raw strings; typed getters are shared. Missing or blank
//! keys give the caller's default, and a present but malformed value is a
//! [`RoundtripError::ConfigInvalid`] rather than a silent default.

use crate::domain::error::RoundtripError;
use rust_decimal::Decimal;
use std::str::FromStr;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Trimmed value, `None` when missing or blank.
    fn get_present(&self, section: &str, key: &str) -> Option<String> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, RoundtripError> {
        match self.get_present(section, key) {
            Some(v) => v.parse().map_err(|e| {
                RoundtripError::invalid(section, key, format!("'{v}' is not an integer: {e}"))
            }),
            None => Ok(default),
        }
    }

    /// Accepts true/yes/on/1 and false/no/off/0, case-insensitively.
    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, RoundtripError> {
        let Some(v) = self.get_present(section, key) else {
            return Ok(default);
        };
        match v.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(RoundtripError::invalid(
                section,
                key,
                format!("'{v}' is not a boolean (expected true/false, yes/no, on/off, 1/0)"),
            )),
        }
    }

    fn get_decimal(
        &self,
        section: &str,
        key: &str,
        default: Decimal,
    ) -> Result<Decimal, RoundtripError> {
        match self.get_present(section, key) {
            Some(v) => Decimal::from_str(&v).map_err(|e| {
                RoundtripError::invalid(section, key, format!("'{v}' is not a decimal number: {e}"))
            }),
            None => Ok(default),
        }
    }
}
