//! Typed parsers for counts reported by servers and tools.

use serde_json::Value;

use crate::error::ParseError;

/// Extracts `total` from a FHIR searchset Bundle.
pub fn parse_total(body: &str) -> Result<u64, ParseError> {
    let json: Value = serde_json::from_str(body)?;
    total_of(&json)
}

pub fn total_of(json: &Value) -> Result<u64, ParseError> {
    let total = json
        .get("total")
        .ok_or(ParseError::MissingField { field: "total" })?;
    total.as_u64().ok_or_else(|| ParseError::NotACount {
        field: "total".to_string(),
        value: total.to_string(),
    })
}

/// Reads the row count from row-count tool output.
///
/// The count is the whitespace-separated field at zero-based `column` of the
/// last non-blank line, e.g. `Total RowCount: 12` with `column = 2`.
pub fn parse_row_count(output: &str, column: usize) -> Result<u64, ParseError> {
    let line = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(ParseError::EmptyOutput)?;

    let field = line
        .split_whitespace()
        .nth(column)
        .ok_or_else(|| ParseError::MissingColumn {
            line: line.to_string(),
            column,
        })?;

    field.parse::<u64>().map_err(|_| ParseError::NotACount {
        field: format!("column {column}"),
        value: field.to_string(),
    })
}
