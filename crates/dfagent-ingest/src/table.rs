// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use serde::Serialize;

/// Coarse column types used for grounding the agent.  Deliberately not a
/// full type system: the agent only needs enough to write sensible code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
    Date,
    Boolean,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Date => "date",
            Self::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
}

/// One named table: ordered columns, row-major cells stored as the strings
/// they were parsed from.  Typed interpretation happens sandbox-side; the
/// host only needs shapes, names, and samples.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, inferring one coarse type per column from its values.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| Column {
                name: h.clone(),
                dtype: infer_column_type(rows.iter().filter_map(|r| r.get(i).map(|s| s.as_str()))),
            })
            .collect();
        Self { name: name.into(), columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Render the table (or its leading `limit` rows) as CSV text.
    /// Used to seed the sandbox session with the data files.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_row(&mut out, self.columns.iter().map(|c| c.name.as_str()));
        for row in &self.rows {
            push_csv_row(&mut out, row.iter().map(|s| s.as_str()));
        }
        out
    }
}

fn push_csv_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(',');
        }
        first = false;
        if cell.contains([',', '"', '\n']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

/// Infer one coarse type from a column's values.  Empty cells are ignored;
/// a column with no non-empty values is text.
pub fn infer_column_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut saw_any = false;
    let mut all_numeric = true;
    let mut all_boolean = true;
    let mut all_date = true;

    for v in values {
        let v = v.trim();
        if v.is_empty() {
            continue;
        }
        saw_any = true;
        if all_numeric && v.parse::<f64>().is_err() {
            all_numeric = false;
        }
        if all_boolean && !matches!(v.to_ascii_lowercase().as_str(), "true" | "false") {
            all_boolean = false;
        }
        if all_date && !is_date_like(v) {
            all_date = false;
        }
        if !all_numeric && !all_boolean && !all_date {
            return ColumnType::Text;
        }
    }

    if !saw_any {
        return ColumnType::Text;
    }
    // Boolean wins over numeric so "true"/"false" columns do not read as text,
    // and numeric wins over date because bare numbers are never date-like.
    if all_boolean {
        ColumnType::Boolean
    } else if all_numeric {
        ColumnType::Numeric
    } else if all_date {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

fn is_date_like(v: &str) -> bool {
    use chrono::{DateTime, NaiveDate};
    NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok()
        || NaiveDate::parse_from_str(v, "%Y/%m/%d").is_ok()
        || NaiveDate::parse_from_str(v, "%m/%d/%Y").is_ok()
        || DateTime::parse_from_rfc3339(v).is_ok()
}

/// The normalized collection of named tables for one invocation.
///
/// Names are unique and stable for the lifetime of the invocation.  The
/// set preserves insertion order, which is the deterministic first-seen
/// order of the input sources; all downstream output (grounding summary,
/// `dataframes_loaded`) follows it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, resolving name collisions by appending `_2`, `_3`, …
    /// in first-seen order.  Returns the name actually used.  Collisions are
    /// suffixed rather than overwritten so no source data is silently lost.
    pub fn insert(&mut self, mut table: Table) -> String {
        if self.get(&table.name).is_some() {
            let base = table.name.clone();
            let mut n = 2;
            while self.get(&format!("{base}_{n}")).is_some() {
                n += 1;
            }
            table.name = format!("{base}_{n}");
        }
        let name = table.name.clone();
        self.tables.push(table);
        name
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str) -> Table {
        Table::new(name, vec!["a".into()], vec![vec!["1".into()]])
    }

    // ── Type inference ────────────────────────────────────────────────────────

    #[test]
    fn infers_numeric_column() {
        let t = infer_column_type(["1", "2.5", "-3"].into_iter());
        assert_eq!(t, ColumnType::Numeric);
    }

    #[test]
    fn infers_boolean_column() {
        let t = infer_column_type(["true", "FALSE", "True"].into_iter());
        assert_eq!(t, ColumnType::Boolean);
    }

    #[test]
    fn infers_date_column() {
        let t = infer_column_type(["2024-01-31", "2024/02/01", "12/31/2024"].into_iter());
        assert_eq!(t, ColumnType::Date);
    }

    #[test]
    fn mixed_values_are_text() {
        let t = infer_column_type(["1", "apple"].into_iter());
        assert_eq!(t, ColumnType::Text);
    }

    #[test]
    fn empty_cells_are_ignored_for_inference() {
        let t = infer_column_type(["", "42", "  ", "7"].into_iter());
        assert_eq!(t, ColumnType::Numeric);
    }

    #[test]
    fn all_empty_column_is_text() {
        let t = infer_column_type(["", ""].into_iter());
        assert_eq!(t, ColumnType::Text);
    }

    // ── Table ─────────────────────────────────────────────────────────────────

    #[test]
    fn table_counts_rows_and_columns() {
        let t = Table::new(
            "sales",
            vec!["region".into(), "amount".into()],
            vec![
                vec!["north".into(), "10".into()],
                vec!["south".into(), "20".into()],
            ],
        );
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.columns[1].dtype, ColumnType::Numeric);
    }

    #[test]
    fn to_csv_quotes_cells_with_commas() {
        let t = Table::new(
            "t",
            vec!["note".into()],
            vec![vec!["a, b".into()], vec![r#"say "hi""#.into()]],
        );
        let csv = t.to_csv();
        assert!(csv.contains("\"a, b\""));
        assert!(csv.contains(r#""say ""hi""""#));
    }

    // ── TableSet naming ───────────────────────────────────────────────────────

    #[test]
    fn insert_preserves_first_seen_order() {
        let mut set = TableSet::new();
        set.insert(table("b"));
        set.insert(table("a"));
        assert_eq!(set.names(), vec!["b", "a"]);
    }

    #[test]
    fn collision_gets_numeric_suffix() {
        let mut set = TableSet::new();
        assert_eq!(set.insert(table("rep")), "rep");
        assert_eq!(set.insert(table("rep")), "rep_2");
        assert_eq!(set.insert(table("rep")), "rep_3");
        assert_eq!(set.names(), vec!["rep", "rep_2", "rep_3"]);
    }

    #[test]
    fn collision_resolution_is_reproducible() {
        let build = || {
            let mut set = TableSet::new();
            set.insert(table("x"));
            set.insert(table("x"));
            set.insert(table("x_2"));
            set.names()
        };
        assert_eq!(build(), build());
        assert_eq!(build(), vec!["x", "x_2", "x_2_2"]);
    }
}
