//! Response format options set by request headers

use serde::Serialize;

use crate::query::{QueryError, QueryResult};

/// `OutputFormat:` header value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `csv`: separator-delimited, no quoting
    #[default]
    BrokenCsv,
    /// `CSV`: RFC 4180
    Csv,
    Json,
    /// `python` and `python3`
    Python,
}

impl OutputFormat {
    pub fn parse(token: &str) -> QueryResult<Self> {
        match token {
            "csv" => Ok(Self::BrokenCsv),
            "CSV" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "python" | "python3" => Ok(Self::Python),
            other => Err(QueryError::invalid_header(format!("unknown output format '{}'", other))),
        }
    }
}

/// `Separators:` header value, used by the `csv` format
///
/// The wire form carries a fourth code, the host/service separator inside
/// host-and-service list columns. No table offers such a column, so the
/// code is validated and then ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Separators {
    pub dataset: u8,
    pub field: u8,
    pub list: u8,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            dataset: b'\n',
            field: b';',
            list: b',',
        }
    }
}

impl Separators {
    /// Parses one to four decimal byte codes. Missing trailing codes keep
    /// their defaults.
    pub fn parse(argument: &str) -> QueryResult<Self> {
        let tokens: Vec<&str> = argument.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > 4 {
            return Err(QueryError::invalid_header(format!(
                "Separators expects 1 to 4 byte codes, got '{}'",
                argument
            )));
        }
        let codes = tokens
            .iter()
            .map(|token| token.parse::<u8>().map_err(|_| QueryError::malformed("byte", *token)))
            .collect::<QueryResult<Vec<u8>>>()?;

        let defaults = Self::default();
        Ok(Self {
            dataset: codes.first().copied().unwrap_or(defaults.dataset),
            field: codes.get(1).copied().unwrap_or(defaults.field),
            list: codes.get(2).copied().unwrap_or(defaults.list),
        })
    }
}

/// `ResponseHeader:` header value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseHeader {
    #[default]
    Off,
    Fixed16,
}

impl ResponseHeader {
    pub fn parse(token: &str) -> QueryResult<Self> {
        match token {
            "off" => Ok(Self::Off),
            "fixed16" => Ok(Self::Fixed16),
            other => Err(QueryError::invalid_header(format!(
                "unknown response header '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        assert_eq!(OutputFormat::parse("csv").unwrap(), OutputFormat::BrokenCsv);
        assert_eq!(OutputFormat::parse("CSV").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::parse("python3").unwrap(), OutputFormat::Python);
        assert!(OutputFormat::parse("xml").is_err());
    }

    #[test]
    fn test_separators() {
        assert_eq!(Separators::parse("10 59 44 124").unwrap(), Separators::default());
        let custom = Separators::parse("0 9").unwrap();
        assert_eq!(custom.dataset, 0);
        assert_eq!(custom.field, b'\t');
        assert_eq!(custom.list, b',');
        assert!(matches!(
            Separators::parse("10 300"),
            Err(QueryError::MalformedLiteral { .. })
        ));
        assert!(Separators::parse("").is_err());
    }

    #[test]
    fn test_host_service_code_is_validated_and_ignored() {
        assert_eq!(Separators::parse("10 59 44 35").unwrap(), Separators::default());
        assert!(Separators::parse("10 59 44 999").is_err());
        assert!(Separators::parse("10 59 44 124 0").is_err());
    }

    #[test]
    fn test_response_header() {
        assert_eq!(ResponseHeader::parse("fixed16").unwrap(), ResponseHeader::Fixed16);
        assert!(ResponseHeader::parse("fixed32").is_err());
    }
}
