//! One renderer per output format

use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::column::Value;

use super::format::{OutputFormat, Separators};

const NULL_CSV: &[u8] = b"NA";

/// Serializes a result table into a response body
pub trait Renderer {
    fn begin_query(&mut self, _out: &mut Vec<u8>) {}

    /// `index` counts from zero across header and data rows
    fn row(&mut self, index: usize, row: &[Value], out: &mut Vec<u8>);

    fn end_query(&mut self, _out: &mut Vec<u8>) {}
}

/// Renderer for a format
pub fn renderer_for(format: OutputFormat, separators: Separators) -> Box<dyn Renderer> {
    match format {
        OutputFormat::BrokenCsv => Box::new(BrokenCsvRenderer { separators }),
        OutputFormat::Csv => Box::new(CsvRenderer),
        OutputFormat::Json => Box::new(JsonRenderer { python: false }),
        OutputFormat::Python => Box::new(JsonRenderer { python: true }),
    }
}

/// Renders `rows` completely
pub fn render<'a>(
    format: OutputFormat,
    separators: Separators,
    rows: impl IntoIterator<Item = &'a [Value]>,
) -> Vec<u8> {
    let mut renderer = renderer_for(format, separators);
    let mut out = Vec::new();
    renderer.begin_query(&mut out);
    for (index, row) in rows.into_iter().enumerate() {
        renderer.row(index, row, &mut out);
    }
    renderer.end_query(&mut out);
    out
}

fn finite(d: f64) -> Option<f64> {
    d.is_finite().then_some(d)
}

/// `csv`: configurable separators, no escaping
struct BrokenCsvRenderer {
    separators: Separators,
}

impl BrokenCsvRenderer {
    fn field(&self, value: &Value, out: &mut Vec<u8>) {
        match value {
            Value::Null => out.extend_from_slice(NULL_CSV),
            Value::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Value::Double(d) => match finite(*d) {
                Some(d) => out.extend_from_slice(d.to_string().as_bytes()),
                None => out.extend_from_slice(NULL_CSV),
            },
            Value::String(s) => out.extend_from_slice(s.as_bytes()),
            Value::Time(t) => out.extend_from_slice(t.timestamp().to_string().as_bytes()),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(self.separators.list);
                    }
                    out.extend_from_slice(item.as_bytes());
                }
            }
            Value::Blob(bytes) => out.extend_from_slice(bytes),
        }
    }
}

impl Renderer for BrokenCsvRenderer {
    fn row(&mut self, _index: usize, row: &[Value], out: &mut Vec<u8>) {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(self.separators.field);
            }
            self.field(value, out);
        }
        out.push(self.separators.dataset);
    }
}

/// `CSV`: RFC 4180 quoting
struct CsvRenderer;

impl CsvRenderer {
    fn quoted(bytes: &[u8], out: &mut Vec<u8>) {
        out.push(b'"');
        for &b in bytes {
            if b == b'"' {
                out.push(b'"');
            }
            out.push(b);
        }
        out.push(b'"');
    }
}

impl Renderer for CsvRenderer {
    fn row(&mut self, _index: usize, row: &[Value], out: &mut Vec<u8>) {
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            match value {
                Value::Null => out.extend_from_slice(NULL_CSV),
                Value::Double(d) if !d.is_finite() => out.extend_from_slice(NULL_CSV),
                Value::Int(i) => Self::quoted(i.to_string().as_bytes(), out),
                Value::Double(d) => Self::quoted(d.to_string().as_bytes(), out),
                Value::String(s) => Self::quoted(s.as_bytes(), out),
                Value::Time(t) => Self::quoted(t.timestamp().to_string().as_bytes(), out),
                Value::List(items) => Self::quoted(items.join(",").as_bytes(), out),
                Value::Blob(bytes) => Self::quoted(bytes, out),
            }
        }
        out.extend_from_slice(b"\r\n");
    }
}

/// `json` and `python`: a list of lists, one row per line
struct JsonRenderer {
    python: bool,
}

impl JsonRenderer {
    fn string(s: &str, out: &mut Vec<u8>) {
        // serde_json escaping is valid Python string literal syntax
        let _ = serde_json::to_writer(&mut *out, s);
    }

    fn null(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(if self.python { b"None" } else { b"null" });
    }

    fn python_bytes(bytes: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(b"b\"");
        for &b in bytes {
            match b {
                b'\\' => out.extend_from_slice(b"\\\\"),
                b'"' => out.extend_from_slice(b"\\\""),
                0x20..=0x7e => out.push(b),
                _ => {
                    let _ = write!(out, "\\x{:02x}", b);
                }
            }
        }
        out.push(b'"');
    }

    fn field(&self, value: &Value, out: &mut Vec<u8>) {
        match value {
            Value::Null => self.null(out),
            Value::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Value::Double(d) => match finite(*d).and_then(serde_json::Number::from_f64) {
                Some(n) => out.extend_from_slice(n.to_string().as_bytes()),
                None => self.null(out),
            },
            Value::String(s) => Self::string(s, out),
            Value::Time(t) => out.extend_from_slice(t.timestamp().to_string().as_bytes()),
            Value::List(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    Self::string(item, out);
                }
                out.push(b']');
            }
            Value::Blob(bytes) if self.python => Self::python_bytes(bytes, out),
            Value::Blob(bytes) => Self::string(&BASE64.encode(bytes), out),
        }
    }
}

impl Renderer for JsonRenderer {
    fn begin_query(&mut self, out: &mut Vec<u8>) {
        out.push(b'[');
    }

    fn row(&mut self, index: usize, row: &[Value], out: &mut Vec<u8>) {
        if index > 0 {
            out.extend_from_slice(b",\n");
        }
        out.push(b'[');
        for (i, value) in row.iter().enumerate() {
            if i > 0 {
                out.push(b',');
            }
            self.field(value, out);
        }
        out.push(b']');
    }

    fn end_query(&mut self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"]\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> Vec<Vec<Value>> {
        vec![
            vec![
                Value::String("web;01".into()),
                Value::Int(2),
                Value::Double(0.5),
                Value::List(vec!["a".into(), "b".into()]),
            ],
            vec![
                Value::String("say \"hi\"".into()),
                Value::Null,
                Value::Double(f64::NAN),
                Value::List(vec![]),
            ],
        ]
    }

    fn render_all(format: OutputFormat, rows: &[Vec<Value>]) -> String {
        let bytes = render(format, Separators::default(), rows.iter().map(Vec::as_slice));
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_broken_csv() {
        let out = render_all(OutputFormat::BrokenCsv, &sample());
        assert_eq!(out, "web;01;2;0.5;a,b\nsay \"hi\";NA;NA;\n");
    }

    #[test]
    fn test_broken_csv_custom_separators() {
        let separators = Separators::parse("0 9 124 44").unwrap();
        let rows = [vec![Value::Int(1), Value::List(vec!["x".into(), "y".into()])]];
        let out = render(OutputFormat::BrokenCsv, separators, rows.iter().map(Vec::as_slice));
        assert_eq!(out, b"1\tx|y\0");
    }

    #[test]
    fn test_rfc_csv() {
        let out = render_all(OutputFormat::Csv, &sample());
        assert_eq!(
            out,
            "\"web;01\",\"2\",\"0.5\",\"a,b\"\r\n\"say \"\"hi\"\"\",NA,NA,\"\"\r\n"
        );
    }

    #[test]
    fn test_json_round_trip() {
        let out = render_all(OutputFormat::Json, &sample());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                ["web;01", 2, 0.5, ["a", "b"]],
                ["say \"hi\"", null, null, []]
            ])
        );
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_json_time_and_blob() {
        let when = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let rows = [vec![Value::Time(when), Value::Blob(vec![0, 255])]];
        let out = render_all(OutputFormat::Json, &rows);
        assert_eq!(out, "[[1700000000,\"AP8=\"]]\n");
    }

    #[test]
    fn test_python_literals() {
        let rows = [vec![
            Value::Null,
            Value::Blob(b"a\"\\\x01".to_vec()),
            Value::String("x".into()),
        ]];
        let out = render_all(OutputFormat::Python, &rows);
        assert_eq!(out, "[[None,b\"a\\\"\\\\\\x01\",\"x\"]]\n");
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(render_all(OutputFormat::Json, &[]), "[]\n");
        assert_eq!(render_all(OutputFormat::BrokenCsv, &[]), "");
    }
}
