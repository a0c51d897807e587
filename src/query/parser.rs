//! Request text parser
//!
//! Splits a request block into the target table and typed header lines.
//! Column names and filter expressions stay textual here; they are resolved
//! against the table when the [`Query`](super::Query) is built.
//!
//! ```text
//! GET hosts
//! Columns: name state
//! Filter: state != 0
//! OutputFormat: json
//! ```

use crate::output::{OutputFormat, ResponseHeader, Separators};

use super::errors::{QueryError, QueryResult};
use super::sorter::SortDirection;

/// One parsed header line
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    Columns(Vec<String>),
    /// `<column> <op> <literal>`, kept raw
    Filter(String),
    And(usize),
    Or(usize),
    Negate,
    /// Aggregate or filtered count, kept raw
    Stats(String),
    StatsAnd(usize),
    StatsOr(usize),
    StatsNegate,
    Limit(usize),
    OrderBy { column: String, direction: SortDirection },
    OutputFormat(OutputFormat),
    ColumnHeaders(bool),
    Separators(Separators),
    ResponseHeader(ResponseHeader),
    AuthUser(String),
    KeepAlive(bool),
}

/// A request: `GET <table>` plus its headers, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub table: String,
    pub headers: Vec<Header>,
}

impl Request {
    /// Parses one request block. Parsing stops at the first empty line after
    /// the request line.
    pub fn parse(text: &str) -> QueryResult<Self> {
        let mut lines = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .skip_while(|line| line.trim().is_empty());

        let request_line = lines
            .next()
            .ok_or_else(|| QueryError::invalid_header("empty request"))?;
        let table = request_line
            .strip_prefix("GET ")
            .map(str::trim)
            .filter(|table| !table.is_empty())
            .ok_or_else(|| {
                QueryError::invalid_header(format!("invalid request line '{}'", request_line))
            })?;

        let headers = lines
            .take_while(|line| !line.is_empty())
            .map(parse_header)
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Self {
            table: table.to_string(),
            headers,
        })
    }

    /// Value of the last `AuthUser:` header
    pub fn auth_user(&self) -> Option<&str> {
        self.headers.iter().rev().find_map(|header| match header {
            Header::AuthUser(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Response header mode, also needed to frame parse errors
    pub fn response_header(&self) -> ResponseHeader {
        self.headers
            .iter()
            .rev()
            .find_map(|header| match header {
                Header::ResponseHeader(mode) => Some(*mode),
                _ => None,
            })
            .unwrap_or_default()
    }
}

/// Best-effort response header mode of a request that failed to parse
pub fn sniff_response_header(text: &str) -> ResponseHeader {
    text.lines()
        .filter_map(|line| line.strip_prefix("ResponseHeader:"))
        .filter_map(|argument| ResponseHeader::parse(argument.trim()).ok())
        .last()
        .unwrap_or_default()
}

fn parse_header(line: &str) -> QueryResult<Header> {
    let (name, argument) = line
        .split_once(':')
        .ok_or_else(|| {
            QueryError::invalid_header(format!("missing ':' in header line '{}'", line))
        })?;
    let argument = argument.trim_start();

    let header = match name {
        "Columns" => Header::Columns(argument.split_whitespace().map(String::from).collect()),
        "Filter" => Header::Filter(argument.to_string()),
        "And" => Header::And(parse_count(name, argument)?),
        "Or" => Header::Or(parse_count(name, argument)?),
        "Negate" => Header::Negate,
        "Stats" => Header::Stats(argument.to_string()),
        "StatsAnd" => Header::StatsAnd(parse_count(name, argument)?),
        "StatsOr" => Header::StatsOr(parse_count(name, argument)?),
        "StatsNegate" => Header::StatsNegate,
        "Limit" => Header::Limit(parse_count(name, argument)?),
        "OrderBy" => {
            let mut tokens = argument.split_whitespace();
            let column = tokens
                .next()
                .ok_or_else(|| QueryError::invalid_header("OrderBy requires a column"))?;
            let direction = match tokens.next() {
                None => SortDirection::Asc,
                Some(token) => SortDirection::parse(token)?,
            };
            if tokens.next().is_some() {
                return Err(QueryError::invalid_header(format!(
                    "trailing arguments in 'OrderBy: {}'",
                    argument
                )));
            }
            Header::OrderBy {
                column: column.to_string(),
                direction,
            }
        }
        "OutputFormat" => Header::OutputFormat(OutputFormat::parse(argument.trim())?),
        "ColumnHeaders" => Header::ColumnHeaders(parse_switch(name, argument)?),
        "Separators" => Header::Separators(Separators::parse(argument)?),
        "ResponseHeader" => Header::ResponseHeader(ResponseHeader::parse(argument.trim())?),
        "AuthUser" => Header::AuthUser(argument.trim().to_string()),
        "KeepAlive" => Header::KeepAlive(parse_switch(name, argument)?),
        other => return Err(QueryError::invalid_header(format!("unknown header '{}'", other))),
    };
    Ok(header)
}

fn parse_count(header: &str, argument: &str) -> QueryResult<usize> {
    argument
        .trim()
        .parse::<usize>()
        .map_err(|_| {
            QueryError::invalid_header(format!(
                "{} expects a non-negative integer, got '{}'",
                header, argument
            ))
        })
}

fn parse_switch(header: &str, argument: &str) -> QueryResult<bool> {
    match argument.trim() {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(QueryError::invalid_header(format!(
            "{} expects on or off, got '{}'",
            header, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = Request::parse(
            "GET hosts\nColumns: name state\nFilter: state != 0\nLimit: 5\n\
             OutputFormat: json\n\nignored\n",
        )
        .unwrap();
        assert_eq!(request.table, "hosts");
        assert_eq!(
            request.headers,
            vec![
                Header::Columns(vec!["name".into(), "state".into()]),
                Header::Filter("state != 0".into()),
                Header::Limit(5),
                Header::OutputFormat(OutputFormat::Json),
            ]
        );
    }

    #[test]
    fn test_crlf_and_leading_blank_lines() {
        let request = Request::parse("\r\nGET status\r\nColumnHeaders: on\r\n").unwrap();
        assert_eq!(request.table, "status");
        assert_eq!(request.headers, vec![Header::ColumnHeaders(true)]);
    }

    #[test]
    fn test_filter_literal_keeps_spaces() {
        let request =
            Request::parse("GET services\nFilter: plugin_output ~ disk  full\nFilter: groups =")
                .unwrap();
        assert_eq!(request.headers[0], Header::Filter("plugin_output ~ disk  full".into()));
        assert_eq!(request.headers[1], Header::Filter("groups =".into()));
    }

    #[test]
    fn test_order_by() {
        let request = Request::parse("GET hosts\nOrderBy: name desc\nOrderBy: state").unwrap();
        assert_eq!(
            request.headers,
            vec![
                Header::OrderBy {
                    column: "name".into(),
                    direction: SortDirection::Desc
                },
                Header::OrderBy {
                    column: "state".into(),
                    direction: SortDirection::Asc
                },
            ]
        );
    }

    #[test]
    fn test_invalid_requests() {
        assert!(Request::parse("").is_err());
        assert!(Request::parse("PUT hosts").is_err());
        assert!(Request::parse("GET ").is_err());
        assert!(Request::parse("GET hosts\nFrobnicate: yes").is_err());
        assert!(Request::parse("GET hosts\nno colon here").is_err());
        assert!(Request::parse("GET hosts\nLimit: -1").is_err());
        assert!(Request::parse("GET hosts\nKeepAlive: maybe").is_err());
    }

    #[test]
    fn test_auth_user_and_response_header() {
        let request =
            Request::parse("GET hosts\nAuthUser: alice\nResponseHeader: fixed16").unwrap();
        assert_eq!(request.auth_user(), Some("alice"));
        assert_eq!(request.response_header(), ResponseHeader::Fixed16);
        assert_eq!(
            sniff_response_header("GET hosts\nBogus: 1\nResponseHeader: fixed16\n"),
            ResponseHeader::Fixed16
        );
    }
}
