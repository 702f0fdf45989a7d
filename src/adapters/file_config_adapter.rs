//! INI file configuration adapter.

use crate::domain::error::RoundtripError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RoundtripError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| RoundtripError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, RoundtripError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| RoundtripError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key).map(|v| v.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[analysis]
starting_cash = 1000
window_days = 30
commission_pct = 0.0005
include_commission = no

[data]
source = csv
csv_dir = /var/lib/roundtrip/bars

[universe]
codes = NOVO-B.CO, DSV.CO
exclude = ^OMXC25
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/var/lib/roundtrip/bars".to_string())
        );
        assert_eq!(
            adapter.get_string("universe", "exclude"),
            Some("^OMXC25".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("analysis", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("analysis", "window_days", 0).unwrap(), 30);
        assert_eq!(adapter.get_int("analysis", "missing", 42).unwrap(), 42);
    }

    #[test]
    fn get_int_rejects_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[analysis]\nwindow_days = abc\n").unwrap();
        let err = adapter.get_int("analysis", "window_days", 30).unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "window_days"));
    }

    #[test]
    fn blank_value_uses_default() {
        let adapter = FileConfigAdapter::from_string("[analysis]\nwindow_days =\n").unwrap();
        assert_eq!(adapter.get_int("analysis", "window_days", 30).unwrap(), 30);
    }

    #[test]
    fn get_decimal_is_exact() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_decimal("analysis", "commission_pct", dec!(1)).unwrap(),
            dec!(0.0005)
        );
        assert_eq!(
            adapter.get_decimal("analysis", "missing", dec!(25)).unwrap(),
            dec!(25)
        );
    }

    #[test]
    fn get_decimal_rejects_garbage() {
        let adapter =
            FileConfigAdapter::from_string("[analysis]\nstarting_cash = lots\n").unwrap();
        let err = adapter
            .get_decimal("analysis", "starting_cash", dec!(100))
            .unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "starting_cash"));
    }

    #[test]
    fn get_bool_parses_variants() {
        let adapter = FileConfigAdapter::from_string(
            "[analysis]\na = true\nb = yes\nc = 0\nd = maybe\ne = Off\n",
        )
        .unwrap();
        assert!(adapter.get_bool("analysis", "a", false).unwrap());
        assert!(adapter.get_bool("analysis", "b", false).unwrap());
        assert!(!adapter.get_bool("analysis", "c", true).unwrap());
        assert!(!adapter.get_bool("analysis", "e", true).unwrap());
        assert!(!adapter.get_bool("analysis", "missing", false).unwrap());

        let err = adapter.get_bool("analysis", "d", true).unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigInvalid { key, .. } if key == "d"));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert!(!adapter.get_bool("analysis", "include_commission", true).unwrap());
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, RoundtripError::ConfigParse { file, .. } if file.contains("config.ini")));
    }
}
