// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use std::fmt::Write;

use dfagent_ingest::TableSet;

/// Render the deterministic table summary the model is grounded on: per
/// table its name, shape, typed columns, and the leading `sample_rows`
/// rows.  Identical inputs produce identical text.
pub fn grounding_summary(tables: &TableSet, sample_rows: usize) -> String {
    if tables.is_empty() {
        return "No tables are loaded.".to_string();
    }

    let mut out = String::new();
    for table in tables.iter() {
        let _ = writeln!(
            out,
            "Table `{}` ({} rows x {} columns)",
            table.name,
            table.row_count(),
            table.column_count()
        );
        let columns = table
            .columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.dtype.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "  columns: {columns}");

        if sample_rows > 0 && table.row_count() > 0 {
            let shown = sample_rows.min(table.row_count());
            let _ = writeln!(out, "  first {shown} rows:");
            for row in table.rows.iter().take(shown) {
                let _ = writeln!(out, "    {}", row.join(", "));
            }
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use dfagent_ingest::Table;

    use super::*;

    fn tables() -> TableSet {
        let mut set = TableSet::new();
        set.insert(Table::new(
            "sales",
            vec!["region".into(), "amount".into()],
            vec![
                vec!["north".into(), "10".into()],
                vec!["south".into(), "20".into()],
                vec!["east".into(), "30".into()],
            ],
        ));
        set
    }

    #[test]
    fn summary_names_every_table_with_shape_and_types() {
        let text = grounding_summary(&tables(), 5);
        assert!(text.contains("Table `sales` (3 rows x 2 columns)"));
        assert!(text.contains("region (text)"));
        assert!(text.contains("amount (numeric)"));
    }

    #[test]
    fn sample_is_capped_at_sample_rows() {
        let text = grounding_summary(&tables(), 2);
        assert!(text.contains("first 2 rows:"));
        assert!(text.contains("north, 10"));
        assert!(text.contains("south, 20"));
        assert!(!text.contains("east, 30"));
    }

    #[test]
    fn summary_is_deterministic() {
        assert_eq!(grounding_summary(&tables(), 3), grounding_summary(&tables(), 3));
    }

    #[test]
    fn empty_set_says_so() {
        assert_eq!(grounding_summary(&TableSet::new(), 5), "No tables are loaded.");
    }

    #[test]
    fn zero_sample_rows_omits_samples() {
        let text = grounding_summary(&tables(), 0);
        assert!(!text.contains("first"));
        assert!(text.contains("columns:"));
    }
}
