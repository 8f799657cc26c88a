// ── Column normalization ──
//
// Turns the service's column descriptors plus raw rows into a table keyed
// by unique display names:
//   1. drop later descriptors that repeat a non-empty key,
//   2. give each present column a display name, disambiguating repeated
//      titles with the key's `{time}` qualifier or an occurrence suffix,
//   3. re-key every row from descriptor key to display name.

use std::collections::{HashMap, HashSet};

use emxg_api::{ColumnDescriptor, RawRecord};
use tracing::{info, warn};

use crate::table::{Record, Table};

/// A retained descriptor and the display column it was mapped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub descriptor: ColumnDescriptor,
    pub display_name: String,
}

/// Stateless normalizer for descriptor lists and row keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnNormalizer;

impl ColumnNormalizer {
    /// Keep the first descriptor for each non-empty key. Descriptors with an
    /// empty key are always kept.
    pub fn dedup(columns: Vec<ColumnDescriptor>) -> Vec<ColumnDescriptor> {
        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        let before = columns.len();

        let retained: Vec<ColumnDescriptor> = columns
            .into_iter()
            .filter(|col| {
                if col.key.is_empty() || seen.insert(col.key.clone()) {
                    true
                } else {
                    if !duplicates.contains(&col.key) {
                        duplicates.push(col.key.clone());
                    }
                    false
                }
            })
            .collect();

        if !duplicates.is_empty() {
            warn!(keys = ?duplicates, "duplicate column keys in response");
            info!(
                retained = retained.len(),
                dropped = before - retained.len(),
                "deduplicated column descriptors"
            );
        }
        retained
    }

    /// Assign display names to descriptors whose key appears in the data.
    ///
    /// The first descriptor with a given title keeps it. Later ones become
    /// `title(qualifier)` when the key carries `{qualifier}`, otherwise
    /// `title_N` where N counts occurrences of that title so far. Names in
    /// `reserved` (raw keys that stay as they are) and names already handed
    /// out are never reused; a clash bumps N until the name is free.
    pub fn resolve<F>(
        descriptors: &[ColumnDescriptor],
        reserved: &[&str],
        mut is_present: F,
    ) -> Vec<ResolvedColumn>
    where
        F: FnMut(&str) -> bool,
    {
        let mut title_counts: HashMap<&str, usize> = HashMap::new();
        let mut taken: HashSet<String> = reserved.iter().map(|k| (*k).to_owned()).collect();
        let mut resolved = Vec::new();

        for col in descriptors {
            if col.key.is_empty() || !is_present(&col.key) {
                continue;
            }
            let title = col.title();
            let count = title_counts.entry(title).or_insert(0);
            *count += 1;
            let occurrence = *count;

            let candidate = if occurrence == 1 {
                title.to_owned()
            } else if let Some(qualifier) = col.time_qualifier() {
                format!("{title}({qualifier})")
            } else {
                format!("{title}_{occurrence}")
            };
            let display_name = free_name(candidate, title, occurrence, &taken);
            taken.insert(display_name.clone());

            resolved.push(ResolvedColumn {
                descriptor: col.clone(),
                display_name,
            });
        }
        resolved
    }

    /// Build the renamed table from raw rows.
    ///
    /// Returns the table plus the descriptors that ended up on a column, in
    /// descriptor order. Keys without a descriptor keep their raw name.
    pub fn normalize(
        columns: Vec<ColumnDescriptor>,
        rows: Vec<RawRecord>,
    ) -> (Table, Vec<ResolvedColumn>) {
        if rows.is_empty() {
            return (Table::empty(), Vec::new());
        }

        let retained = Self::dedup(columns);
        let present: HashSet<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        let described: HashSet<&str> = retained.iter().map(|c| c.key.as_str()).collect();
        let reserved: Vec<&str> = present
            .iter()
            .copied()
            .filter(|key| !described.contains(key))
            .collect();
        let resolved = Self::resolve(&retained, &reserved, |key| present.contains(key));

        let records: Vec<Record> = rows
            .into_iter()
            .map(|row| row.into_iter().map(|(k, v)| (k, v.into())).collect())
            .collect();
        let mut table = Table::from_records(records);

        let mapping: HashMap<String, String> = resolved
            .iter()
            .filter(|r| r.descriptor.key != r.display_name)
            .map(|r| (r.descriptor.key.clone(), r.display_name.clone()))
            .collect();
        table.rename_columns(&mapping);

        (table, resolved)
    }
}

/// `candidate` if unused, else the first free `title_N` with N above
/// `occurrence`.
fn free_name(candidate: String, title: &str, occurrence: usize, taken: &HashSet<String>) -> String {
    if !taken.contains(&candidate) {
        return candidate;
    }
    (occurrence + 1..)
        .map(|n| format!("{title}_{n}"))
        .find(|name| !taken.contains(name))
        .unwrap_or(candidate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::table::{CellValue, Frame};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn col(key: &str, title: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(key, title, "String", "")
    }

    fn raw(value: serde_json::Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn dedup_keeps_first_and_all_empty_keys() {
        let cols = vec![
            col("A", "a1"),
            col("", "e1"),
            col("A", "a2"),
            col("", "e2"),
            col("B", "b"),
        ];
        let titles: Vec<String> = ColumnNormalizer::dedup(cols)
            .into_iter()
            .map(|c| c.title().to_owned())
            .collect();
        assert_eq!(titles, vec!["a1", "e1", "e2", "b"]);
    }

    #[test]
    fn repeated_titles_use_time_qualifier() {
        let cols = vec![
            col("NP{2024-12-31}", "NetProfit"),
            col("NP{2024-09-30}", "NetProfit"),
        ];
        let names: Vec<String> = ColumnNormalizer::resolve(&cols, &[], |_| true)
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["NetProfit", "NetProfit(2024-09-30)"]);
    }

    #[test]
    fn repeated_titles_without_qualifier_get_counter() {
        let cols = vec![col("X1", "Vol"), col("X2", "Vol"), col("X3", "Vol")];
        let names: Vec<String> = ColumnNormalizer::resolve(&cols, &[], |_| true)
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["Vol", "Vol_2", "Vol_3"]);
    }

    #[test]
    fn absent_keys_do_not_count_toward_collisions() {
        let cols = vec![col("GONE", "Vol"), col("X2", "Vol")];
        let resolved = ColumnNormalizer::resolve(&cols, &[], |k| k != "GONE");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].display_name, "Vol");
    }

    #[test]
    fn title_defaults_to_key() {
        let mut bare = col("K", "");
        bare.title = None;
        let resolved = ColumnNormalizer::resolve(&[bare], &[], |_| true);
        assert_eq!(resolved[0].display_name, "K");
    }

    #[test]
    fn normalize_renames_and_keeps_undescribed_columns() {
        let cols = vec![
            col("NP{2024-12-31}", "NetProfit"),
            col("NP{2024-12-31}", "NetProfitDup"),
            col("NP{2024-09-30}", "NetProfit"),
            col("CHG", "Chg"),
        ];
        let rows = vec![
            raw(json!({
                "SECURITY_CODE": "600000",
                "NP{2024-12-31}": "1.2亿",
                "NP{2024-09-30}": "9000万",
                "CHG": "10.5"
            })),
            raw(json!({"SECURITY_CODE": "000001", "CHG": 3, "EXTRA": true})),
        ];

        let (table, resolved) = ColumnNormalizer::normalize(cols, rows);
        assert_eq!(
            table.columns(),
            &["SECURITY_CODE", "NetProfit", "NetProfit(2024-09-30)", "Chg", "EXTRA"]
        );
        assert_eq!(resolved.len(), 3);
        assert_eq!(table.cell(0, "NetProfit").unwrap().as_str(), Some("1.2亿"));
        assert_eq!(table.cell(1, "EXTRA").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn generated_name_never_shadows_a_described_key() {
        let cols = vec![col("A", "Vol"), col("C", "Vol"), col("Vol_2", "Vol_2")];
        let rows = vec![raw(json!({"A": "a", "C": "c", "Vol_2": "v2"}))];

        let (table, resolved) = ColumnNormalizer::normalize(cols, rows);
        assert_eq!(table.columns(), &["Vol", "Vol_2", "Vol_2_2"]);
        assert_eq!(table.cell(0, "Vol").unwrap().as_str(), Some("a"));
        assert_eq!(table.cell(0, "Vol_2").unwrap().as_str(), Some("c"));
        assert_eq!(table.cell(0, "Vol_2_2").unwrap().as_str(), Some("v2"));

        let names: HashSet<&str> = resolved.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names.len(), resolved.len());
    }

    #[test]
    fn generated_name_skips_undescribed_raw_key() {
        let cols = vec![col("A", "Vol"), col("C", "Vol")];
        let rows = vec![raw(json!({"A": 1, "C": 2, "Vol_2": 3}))];

        let (table, _) = ColumnNormalizer::normalize(cols, rows);
        assert_eq!(table.columns(), &["Vol", "Vol_3", "Vol_2"]);
        assert_eq!(table.cell(0, "Vol_3"), Some(&CellValue::Raw(json!(2))));
        assert_eq!(table.cell(0, "Vol_2"), Some(&CellValue::Raw(json!(3))));
    }

    #[test]
    fn normalize_empty_rows_is_empty_table() {
        let (table, resolved) = ColumnNormalizer::normalize(vec![col("A", "a")], Vec::new());
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert!(resolved.is_empty());
    }
}
