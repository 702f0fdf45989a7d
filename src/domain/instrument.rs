//! Instruments and code lists.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instrument {
    pub code: String,
    pub friendly_name: String,
}

impl Instrument {
    pub fn new(code: impl Into<String>, friendly_name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            friendly_name: friendly_name.into(),
        }
    }

    /// Friendly name, falling back to the code when none is stored.
    pub fn display_name(&self) -> &str {
        if self.friendly_name.trim().is_empty() {
            &self.code
        } else {
            &self.friendly_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodeListError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

/// Parse a comma separated code list. Codes are trimmed but keep their case,
/// since tickers such as `^OMXC25` or `NOVO-B.CO` are matched verbatim.
pub fn parse_codes(input: &str) -> Result<Vec<String>, CodeListError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let code = token.trim();
        if code.is_empty() {
            return Err(CodeListError::EmptyToken);
        }
        if !seen.insert(code.to_string()) {
            return Err(CodeListError::DuplicateCode(code.to_string()));
        }
        codes.push(code.to_string());
    }

    Ok(codes)
}

/// Restrict `instruments` to `include` (when given, in that order) and drop
/// anything listed in `exclude`. Included codes with no stored instrument
/// are kept with an empty friendly name.
pub fn select_instruments(
    instruments: Vec<Instrument>,
    include: Option<&[String]>,
    exclude: &[String],
) -> Vec<Instrument> {
    let selected = match include {
        Some(codes) => codes
            .iter()
            .map(|code| {
                instruments
                    .iter()
                    .find(|i| &i.code == code)
                    .cloned()
                    .unwrap_or_else(|| Instrument::new(code.clone(), ""))
            })
            .collect(),
        None => instruments,
    };

    selected
        .into_iter()
        .filter(|i| !exclude.contains(&i.code))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_code() {
        assert_eq!(parse_codes("NOVO-B.CO").unwrap(), vec!["NOVO-B.CO"]);
    }

    #[test]
    fn parse_trims_and_keeps_case() {
        assert_eq!(
            parse_codes(" ^OMXC25 , maersk-b.co").unwrap(),
            vec!["^OMXC25", "maersk-b.co"]
        );
    }

    #[test]
    fn parse_rejects_empty_token() {
        assert_eq!(parse_codes("A,,B"), Err(CodeListError::EmptyToken));
        assert_eq!(parse_codes(""), Err(CodeListError::EmptyToken));
    }

    #[test]
    fn parse_rejects_duplicates() {
        assert_eq!(
            parse_codes("A,B,A"),
            Err(CodeListError::DuplicateCode("A".into()))
        );
    }

    #[test]
    fn display_name_falls_back_to_code() {
        assert_eq!(Instrument::new("DSV.CO", "").display_name(), "DSV.CO");
        assert_eq!(Instrument::new("DSV.CO", "DSV").display_name(), "DSV");
    }

    fn stored() -> Vec<Instrument> {
        vec![
            Instrument::new("^OMXC25", "OMX Copenhagen 25"),
            Instrument::new("NOVO-B.CO", "Novo Nordisk"),
            Instrument::new("DSV.CO", "DSV"),
        ]
    }

    #[test]
    fn select_everything_minus_excluded() {
        let selected = select_instruments(stored(), None, &["^OMXC25".to_string()]);
        let codes: Vec<&str> = selected.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["NOVO-B.CO", "DSV.CO"]);
    }

    #[test]
    fn select_included_in_given_order() {
        let include = vec!["DSV.CO".to_string(), "UNKNOWN".to_string()];
        let selected = select_instruments(stored(), Some(&include), &[]);
        assert_eq!(selected[0], Instrument::new("DSV.CO", "DSV"));
        assert_eq!(selected[1], Instrument::new("UNKNOWN", ""));
    }
}
