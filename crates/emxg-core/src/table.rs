// ── Result table ──
//
// Record-oriented table of normalized rows. All rows share one column
// ordering (first-seen order across rows); a row may lack a cell for a
// column it never carried. Outside this crate the table is read-only.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One normalized cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    /// The value as the service sent it.
    Raw(Value),
}

static MISSING: CellValue = CellValue::Raw(Value::Null);

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Raw(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) | Self::Raw(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Raw(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Raw(Value::Null))
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => fmt_number(*n, f),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Raw(Value::Null) => Ok(()),
            Self::Raw(Value::String(s)) => f.write_str(s),
            Self::Raw(other) => write!(f, "{other}"),
        }
    }
}

fn fmt_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{n:.0}")
    } else {
        write!(f, "{n}")
    }
}

/// One row, keyed by display column name.
pub type Record = IndexMap<String, CellValue>;

/// Read access shared by every table backend.
pub trait Frame {
    /// Column names in display order.
    fn columns(&self) -> &[String];

    /// All rows in server order.
    fn records(&self) -> &[Record];

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell at `row`/`column`, `None` if either is out of range or the row
    /// has no such cell.
    fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        self.records().get(row)?.get(column)
    }
}

/// Ordered, column-addressable container of normalized records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Build from explicit columns plus rows. Keys that appear in rows but
    /// not in `columns` are appended in first-seen order.
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut seen: indexmap::IndexSet<String> = columns.into_iter().collect();
        for row in &rows {
            for key in row.keys() {
                if !seen.contains(key) {
                    seen.insert(key.clone());
                }
            }
        }
        Self {
            columns: seen.into_iter().collect(),
            rows,
        }
    }

    /// Build from rows alone; columns follow first-seen key order.
    pub fn from_records(rows: Vec<Record>) -> Self {
        Self::new(Vec::new(), rows)
    }

    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Record> {
        self.rows.get(index)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Every cell of `name` in row order; rows without the cell yield null.
    /// `None` if the table has no such column.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        if !self.has_column(name) {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(name).unwrap_or(&MISSING))
                .collect(),
        )
    }

    /// Rows in `range` (clamped to the table), same columns.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        Self {
            columns: self.columns.clone(),
            rows: self.rows[start..end].to_vec(),
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Self {
        self.slice(0..n)
    }

    /// Rows matching `predicate`, same columns.
    pub fn filter<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&Record) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Stable sort by `column`. Numeric cells compare numerically, text
    /// cells lexically; missing and non-comparable cells always sort last.
    pub fn sort_by(&self, column: &str, ascending: bool) -> Self {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let (a, b) = (a.get(column), b.get(column));
            match (sort_key(a), sort_key(b)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => {
                    let ord = x.cmp_with(&y);
                    if ascending { ord } else { ord.reverse() }
                }
            }
        });
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    // ── Crate-private mutation (normalization only) ──────────────────

    /// Re-key columns per `mapping`, keeping each column's position.
    pub(crate) fn rename_columns(&mut self, mapping: &HashMap<String, String>) {
        if mapping.is_empty() {
            return;
        }
        let rename = |key: String| mapping.get(&key).cloned().unwrap_or(key);

        let columns: indexmap::IndexSet<String> =
            std::mem::take(&mut self.columns).into_iter().map(rename).collect();
        self.columns = columns.into_iter().collect();

        for row in &mut self.rows {
            let old = std::mem::take(row);
            *row = old.into_iter().map(|(k, v)| (rename(k), v)).collect();
        }
    }

    /// Replace every present cell of `column` with `f(cell)`.
    pub(crate) fn map_column<F>(&mut self, column: &str, mut f: F)
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = f(cell);
            }
        }
    }
}

impl Frame for Table {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn records(&self) -> &[Record] {
        &self.rows
    }
}

enum SortKey<'a> {
    Number(f64),
    Text(&'a str),
}

impl SortKey<'_> {
    // numbers before text
    fn cmp_with(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

fn sort_key(cell: Option<&CellValue>) -> Option<SortKey<'_>> {
    let cell = cell?;
    if let Some(n) = cell.as_f64().filter(|n| !n.is_nan()) {
        return Some(SortKey::Number(n));
    }
    cell.as_str().map(SortKey::Text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(pairs: &[(&str, CellValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn sample() -> Table {
        Table::from_records(vec![
            record(&[("code", json!("600000").into()), ("chg", CellValue::Number(0.1))]),
            record(&[("code", json!("000001").into()), ("chg", CellValue::Number(-0.02))]),
            record(&[("code", json!("300750").into())]),
            record(&[
                ("code", json!("688981").into()),
                ("chg", CellValue::Number(0.05)),
                ("hot", CellValue::Bool(true)),
            ]),
        ])
    }

    #[test]
    fn columns_follow_first_seen_order() {
        let table = sample();
        assert_eq!(table.columns(), &["code", "chg", "hot"]);
        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
    }

    #[test]
    fn column_access_fills_missing_cells_with_null() {
        let table = sample();
        let chg = table.column("chg").unwrap();
        assert_eq!(chg.len(), 4);
        assert!(chg[2].is_null());
        assert_eq!(chg[0].as_f64(), Some(0.1));
        assert!(table.column("nope").is_none());
    }

    #[test]
    fn head_slice_and_filter_keep_columns() {
        let table = sample();
        assert_eq!(table.head(2).len(), 2);
        assert_eq!(table.head(10).len(), 4);
        assert_eq!(table.slice(3..9).len(), 1);
        assert_eq!(table.slice(5..9).len(), 0);

        let positive = table.filter(|r| {
            r.get("chg")
                .and_then(CellValue::as_f64)
                .is_some_and(|v| v > 0.0)
        });
        assert_eq!(positive.len(), 2);
        assert_eq!(positive.columns(), table.columns());
    }

    #[test]
    fn sort_puts_missing_last_in_both_directions() {
        let table = sample();
        let codes = |t: &Table| -> Vec<String> {
            t.column("code").unwrap().iter().map(ToString::to_string).collect()
        };

        let asc = table.sort_by("chg", true);
        assert_eq!(codes(&asc), vec!["000001", "688981", "600000", "300750"]);

        let desc = table.sort_by("chg", false);
        assert_eq!(codes(&desc), vec!["600000", "688981", "000001", "300750"]);
    }

    #[test]
    fn rename_keeps_positions() {
        let mut table = sample();
        let mapping: HashMap<String, String> = [("chg".to_owned(), "Change".to_owned())].into();
        table.rename_columns(&mapping);
        assert_eq!(table.columns(), &["code", "Change", "hot"]);
        let keys: Vec<&String> = table.row(0).unwrap().keys().collect();
        assert_eq!(keys, vec!["code", "Change"]);
    }

    #[test]
    fn frame_cell_access() {
        let table = sample();
        let frame: &dyn Frame = &table;
        assert_eq!(frame.cell(3, "hot"), Some(&CellValue::Bool(true)));
        assert_eq!(frame.cell(0, "hot"), None);
        assert_eq!(frame.cell(99, "code"), None);
    }

    #[test]
    fn display_formats_numbers_compactly() {
        assert_eq!(CellValue::Number(342_000_000.0).to_string(), "342000000");
        assert_eq!(CellValue::Number(0.105).to_string(), "0.105");
        assert_eq!(CellValue::Raw(Value::Null).to_string(), "");
        assert_eq!(CellValue::Bool(false).to_string(), "false");
    }

    #[test]
    fn serializes_untagged() {
        let row = record(&[
            ("n", CellValue::Number(1.5)),
            ("b", CellValue::Bool(true)),
            ("r", json!("x").into()),
        ]);
        assert_eq!(serde_json::to_value(&row).unwrap(), json!({"n": 1.5, "b": true, "r": "x"}));
    }

    #[test]
    fn empty_table_has_nothing() {
        let table = Table::empty();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
