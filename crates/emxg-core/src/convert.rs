// ── Value conversion ──
//
// Converts raw cells according to each column's declared data type and
// unit. Numeric columns expand Chinese magnitude suffixes (亿, 万) and, for
// `%` units, become fractions rounded to four places. Boolean columns
// recognize a fixed marker set. Nothing here fails: a value that cannot be
// converted is kept as-is and reported as a `ConversionIssue`.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use strum::EnumString;
use tracing::debug;

use crate::normalize::ResolvedColumn;
use crate::table::{CellValue, Table};

/// Declared column data type, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum DataType {
    Double,
    Long,
    Integer,
    Boolean,
    #[strum(default)]
    Other(String),
}

impl DataType {
    pub fn parse(raw: &str) -> Self {
        Self::from_str(raw.trim()).unwrap_or_else(|_| Self::Other(raw.to_owned()))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Double | Self::Long | Self::Integer)
    }
}

/// Unit marking percentage columns.
pub const PERCENT_UNIT: &str = "%";

/// Text values a Boolean column treats as `true`. 首板 marks a first limit-up board.
pub const TRUE_MARKERS: &[&str] = &["首板", "True", "true", "1"];

const MAGNITUDES: &[(char, f64)] = &[('亿', 1e8), ('万', 1e4)];

/// Why a value was left unconverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Numeric column, value neither a number nor a magnitude string.
    NotNumeric,
    /// Percentage column, value not parseable as a percentage.
    NotPercentage,
}

/// A cell kept in its raw form because conversion failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionIssue {
    pub column: String,
    pub row: usize,
    pub value: Value,
    pub kind: IssueKind,
}

/// Expand a magnitude-suffixed or plain numeric value.
///
/// `"3.42亿"` → 342000000, `"7668.05万"` → 76680500, `"12.5"` → 12.5,
/// numbers pass through. `None` for anything else.
pub fn expand_magnitude(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Raw(Value::Number(n)) => n.as_f64(),
        CellValue::Raw(Value::String(s)) => parse_magnitude(s),
        _ => None,
    }
}

fn parse_magnitude(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Ok(n) = s.parse::<f64>() {
        return Some(n);
    }
    MAGNITUDES.iter().find_map(|&(suffix, factor)| {
        let prefix = s.strip_suffix(suffix)?;
        prefix.trim().parse::<f64>().ok().map(|n| n * factor)
    })
}

/// Percentage value as a fraction, rounded to four decimal places.
///
/// Accepts numbers and numeric text with an optional `%`. `None` otherwise.
pub fn to_fraction(value: &CellValue) -> Option<f64> {
    let percent = match value {
        CellValue::Number(n) => *n,
        CellValue::Raw(Value::Number(n)) => n.as_f64()?,
        CellValue::Raw(Value::String(s)) => s.replace('%', "").trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(round4(percent / 100.0))
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Whether the value's text form is one of [`TRUE_MARKERS`].
pub fn to_flag(value: &CellValue) -> bool {
    let text = flag_text(value);
    TRUE_MARKERS.contains(&text.trim())
}

// Text form used for marker matching; booleans and null render the way the
// service's own tooling prints them (`True`, `None`).
fn flag_text(value: &CellValue) -> String {
    match value {
        CellValue::Bool(true) | CellValue::Raw(Value::Bool(true)) => "True".to_owned(),
        CellValue::Bool(false) | CellValue::Raw(Value::Bool(false)) => "False".to_owned(),
        CellValue::Number(n) => float_text(*n),
        CellValue::Raw(Value::Null) => "None".to_owned(),
        CellValue::Raw(Value::String(s)) => s.clone(),
        CellValue::Raw(Value::Number(n)) => {
            if n.is_f64() {
                n.as_f64().map_or_else(|| n.to_string(), float_text)
            } else {
                n.to_string()
            }
        }
        CellValue::Raw(other) => other.to_string(),
    }
}

fn float_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.1}")
    } else {
        n.to_string()
    }
}

/// Applies per-column conversions to a normalized table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueConverter;

impl ValueConverter {
    /// Convert one cell. Returns the new cell and, if the value had to be
    /// kept raw, the reason.
    pub fn convert_cell(
        data_type: &DataType,
        unit: &str,
        value: &CellValue,
    ) -> (CellValue, Option<IssueKind>) {
        if data_type.is_numeric() {
            if value.is_null() {
                return (value.clone(), None);
            }
            let expanded = expand_magnitude(value).map_or_else(|| value.clone(), CellValue::Number);
            if unit == PERCENT_UNIT {
                return match to_fraction(&expanded) {
                    Some(f) => (CellValue::Number(f), None),
                    None => (expanded, Some(IssueKind::NotPercentage)),
                };
            }
            return match expanded {
                CellValue::Number(_) => (expanded, None),
                other => (other, Some(IssueKind::NotNumeric)),
            };
        }
        if *data_type == DataType::Boolean {
            return (CellValue::Bool(to_flag(value)), None);
        }
        (value.clone(), None)
    }

    /// Convert every described column of `table` in place.
    pub fn apply(table: &mut Table, columns: &[ResolvedColumn]) -> Vec<ConversionIssue> {
        let mut issues = Vec::new();

        for resolved in columns {
            let data_type = DataType::parse(resolved.descriptor.data_type());
            if matches!(data_type, DataType::Other(_)) {
                continue;
            }
            let unit = resolved.descriptor.unit();
            let column = resolved.display_name.as_str();

            let mut row = 0;
            table.map_column(column, |cell| {
                let (converted, issue) = Self::convert_cell(&data_type, unit, cell);
                if let Some(kind) = issue {
                    debug!(column, row, value = %cell, ?kind, "value left unconverted");
                    issues.push(ConversionIssue {
                        column: column.to_owned(),
                        row,
                        value: raw_json(cell),
                        kind,
                    });
                }
                row += 1;
                converted
            });
        }
        issues
    }
}

fn raw_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Raw(v) => v.clone(),
        CellValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        CellValue::Bool(b) => Value::Bool(*b),
    }
}
