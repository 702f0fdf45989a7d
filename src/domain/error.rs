//! Domain error types.

/// Top-level error type for roundtrip.
///
/// Only hard failures live here. Insufficient data is not an error: it is
/// reported through [`crate::domain::result::AnalysisOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum RoundtripError {
    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("malformed data in {source_name}: {reason}")]
    DataFormat { source_name: String, reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RoundtripError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RoundtripError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&RoundtripError> for std::process::ExitCode {
    fn from(err: &RoundtripError) -> Self {
        let code: u8 = match err {
            RoundtripError::Io(_) => 1,
            RoundtripError::ConfigParse { .. }
            | RoundtripError::ConfigMissing { .. }
            | RoundtripError::ConfigInvalid { .. } => 2,
            RoundtripError::Database { .. } | RoundtripError::DatabaseQuery { .. } => 3,
            RoundtripError::DataFormat { .. } => 4,
            RoundtripError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message_names_section_and_key() {
        let err = RoundtripError::invalid("analysis", "starting_cash", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [analysis] starting_cash: must be positive"
        );
    }

    #[test]
    fn data_format_message() {
        let err = RoundtripError::DataFormat {
            source_name: "NOVO.csv".into(),
            reason: "missing timestamp column".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed data in NOVO.csv: missing timestamp column"
        );
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RoundtripError = io.into();
        assert!(matches!(err, RoundtripError::Io(_)));
    }
}
