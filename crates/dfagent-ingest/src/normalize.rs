// Copyright (c) 2025-2026 dfagent contributors
//
// SPDX-License-Identifier: MIT
use bytes::Bytes;
use tracing::{debug, warn};

use dfagent_storage::ObjectStore;

use crate::{IngestError, Table, TableSet};

/// The result of normalizing one batch of sources.  A failed source never
/// aborts the batch: its error is reported here next to the tables that
/// did load.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub tables: TableSet,
    pub failures: Vec<SourceFailure>,
}

#[derive(Debug)]
pub struct SourceFailure {
    pub name: String,
    pub error: IngestError,
}

/// Convert a mapping of logical-name → source URI into a uniquely named
/// set of in-memory tables.
///
/// Naming rules:
/// - logical names are snake_cased (lowercased, spaces become
///   underscores) so the agent can use them as identifiers;
/// - CSV / Parquet / JSON sources produce one table named after the source;
/// - a spreadsheet with a single sheet produces one table named after the
///   source, a multi-sheet spreadsheet produces `{name}_{sheet}` per sheet
///   in workbook order, keeping the sheet name's case;
/// - name collisions get a deterministic `_2`, `_3`, … suffix in
///   first-seen order (see [`TableSet::insert`]).
pub async fn normalize(
    sources: &[(String, String)],
    store: &dyn ObjectStore,
) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    for (logical_name, uri) in sources {
        let name = to_snake_case(logical_name);
        match load_source(&name, uri, store).await {
            Ok(tables) => {
                for table in tables {
                    let used = outcome.tables.insert(table);
                    debug!(source = %name, table = %used, "table hydrated");
                }
            }
            Err(error) => {
                warn!(source = %name, %error, "source failed to load");
                outcome.failures.push(SourceFailure { name: name.clone(), error });
            }
        }
    }

    outcome
}

async fn load_source(
    name: &str,
    uri: &str,
    store: &dyn ObjectStore,
) -> Result<Vec<Table>, IngestError> {
    let extension = uri_extension(uri);
    let format = match extension.as_str() {
        "csv" => Format::Csv,
        "parquet" => Format::Parquet,
        "json" => Format::Json,
        "xlsx" | "xls" => Format::Spreadsheet,
        _ => {
            return Err(IngestError::UnsupportedFormat {
                name: name.to_string(),
                extension,
            })
        }
    };

    let bytes = store
        .fetch(uri)
        .await
        .map_err(|e| IngestError::SourceLoad { name: name.to_string(), reason: e.to_string() })?;

    parse_source(name, format, bytes)
}

enum Format {
    Csv,
    Parquet,
    Json,
    Spreadsheet,
}

fn parse_source(name: &str, format: Format, bytes: Bytes) -> Result<Vec<Table>, IngestError> {
    match format {
        Format::Csv => parse_csv(name, &bytes).map(|t| vec![t]),
        Format::Parquet => parse_parquet(name, bytes).map(|t| vec![t]),
        Format::Json => parse_json(name, &bytes).map(|t| vec![t]),
        Format::Spreadsheet => parse_spreadsheet(name, &bytes),
    }
}

/// Extension of the URI's path portion, lowercased (query/fragment ignored).
fn uri_extension(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.contains('/') => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Lowercase with spaces as underscores, mirroring how uploaded file names
/// become table identifiers.
fn to_snake_case(text: &str) -> String {
    text.to_lowercase().replace(' ', "_")
}

fn parse_err(name: &str, reason: impl std::fmt::Display) -> IngestError {
    IngestError::Parse { name: name.to_string(), reason: reason.to_string() }
}

// ─── CSV ─────────────────────────────────────────────────────────────────────

fn parse_csv(name: &str, bytes: &[u8]) -> Result<Table, IngestError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_err(name, e))?
        .iter()
        .map(String::from)
        .collect();
    if headers.is_empty() {
        return Err(parse_err(name, "no columns to parse"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| parse_err(name, e))?;
        let mut row: Vec<String> = record.iter().map(String::from).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    Ok(Table::new(name, headers, rows))
}

// ─── JSON (record-oriented) ──────────────────────────────────────────────────

fn parse_json(name: &str, bytes: &[u8]) -> Result<Table, IngestError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| parse_err(name, e))?;
    let records = value
        .as_array()
        .ok_or_else(|| parse_err(name, "expected a top-level array of records"))?;

    // Column order: first appearance across records.
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        let obj = record
            .as_object()
            .ok_or_else(|| parse_err(name, "expected every record to be an object"))?;
        for key in obj.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            let obj = record.as_object().unwrap_or_else(|| unreachable!());
            headers
                .iter()
                .map(|h| obj.get(h).map(json_cell).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(Table::new(name, headers, rows))
}

fn json_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─── Parquet ─────────────────────────────────────────────────────────────────

fn parse_parquet(name: &str, bytes: Bytes) -> Result<Table, IngestError> {
    use parquet::file::reader::{FileReader, SerializedFileReader};
    use parquet::record::Field;

    let reader = SerializedFileReader::new(bytes).map_err(|e| parse_err(name, e))?;
    let headers: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut rows = Vec::new();
    let row_iter = reader.get_row_iter(None).map_err(|e| parse_err(name, e))?;
    for row in row_iter {
        let row = row.map_err(|e| parse_err(name, e))?;
        let cells = row
            .get_column_iter()
            .map(|(_, field)| match field {
                Field::Null => String::new(),
                Field::Bool(b) => b.to_string(),
                Field::Byte(v) => v.to_string(),
                Field::Short(v) => v.to_string(),
                Field::Int(v) => v.to_string(),
                Field::Long(v) => v.to_string(),
                Field::UByte(v) => v.to_string(),
                Field::UShort(v) => v.to_string(),
                Field::UInt(v) => v.to_string(),
                Field::ULong(v) => v.to_string(),
                Field::Float(v) => v.to_string(),
                Field::Double(v) => v.to_string(),
                Field::Str(s) => s.clone(),
                other => format!("{other:?}"),
            })
            .collect();
        rows.push(cells);
    }

    Ok(Table::new(name, headers, rows))
}

// ─── Spreadsheets ────────────────────────────────────────────────────────────

fn parse_spreadsheet(name: &str, bytes: &[u8]) -> Result<Vec<Table>, IngestError> {
    use calamine::{open_workbook_auto_from_rs, Data, Reader};

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(|e| parse_err(name, e))?;
    let sheet_names = workbook.sheet_names().to_owned();
    let single_sheet = sheet_names.len() == 1;

    let mut tables = Vec::new();
    for sheet in &sheet_names {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| parse_err(name, e))?;

        let mut row_iter = range.rows();
        let headers: Vec<String> = match row_iter.next() {
            Some(header_row) => header_row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let h = cell_text(cell);
                    if h.is_empty() { format!("column_{}", i + 1) } else { h }
                })
                .collect(),
            None => Vec::new(),
        };

        let rows: Vec<Vec<String>> = row_iter
            .map(|row| {
                let mut cells: Vec<String> = row.iter().map(cell_text).collect();
                cells.resize(headers.len(), String::new());
                cells
            })
            .collect();

        let table_name = if single_sheet {
            name.to_string()
        } else {
            sheet_table_name(name, sheet)
        };
        tables.push(Table::new(table_name, headers, rows));
    }

    fn cell_text(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    Ok(tables)
}

/// Table name for one sheet of a multi-sheet workbook.  The sheet name
/// keeps its case so `rep` with sheets Q1/Q2 yields `rep_Q1`, `rep_Q2`;
/// only spaces are normalized.
fn sheet_table_name(name: &str, sheet: &str) -> String {
    format!("{name}_{}", sheet.replace(' ', "_"))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use dfagent_storage::MemoryStore;

    use super::*;
    use crate::ColumnType;

    fn sources(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(n, u)| (n.to_string(), u.to_string())).collect()
    }

    // ── Extension and name handling ───────────────────────────────────────────

    #[test]
    fn extension_ignores_query_string() {
        assert_eq!(uri_extension("https://s/bucket/sales.CSV?sig=abc"), "csv");
        assert_eq!(uri_extension("s3://bucket/report.xlsx"), "xlsx");
        assert_eq!(uri_extension("s3://bucket/noext"), "");
    }

    #[test]
    fn snake_case_lowers_and_replaces_spaces() {
        assert_eq!(to_snake_case("Sales Report 2024"), "sales_report_2024");
    }

    #[test]
    fn sheet_names_keep_their_case() {
        assert_eq!(sheet_table_name("rep", "Q1"), "rep_Q1");
        assert_eq!(sheet_table_name("rep", "Summary 2024"), "rep_Summary_2024");
    }

    // ── CSV ───────────────────────────────────────────────────────────────────

    #[test]
    fn csv_single_table_shape() {
        let t = parse_csv("sales", b"region,amount\nnorth,10\nsouth,20\n").unwrap();
        assert_eq!(t.name, "sales");
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.columns[1].dtype, ColumnType::Numeric);
    }

    #[test]
    fn csv_short_rows_are_padded() {
        let t = parse_csv("t", b"a,b,c\n1,2\n").unwrap();
        assert_eq!(t.rows[0], vec!["1", "2", ""]);
    }

    // ── JSON ──────────────────────────────────────────────────────────────────

    #[test]
    fn json_records_become_one_table() {
        let t = parse_json(
            "orders",
            br#"[{"id": 1, "item": "apple"}, {"id": 2, "item": "pear", "qty": 3}]"#,
        )
        .unwrap();
        assert_eq!(t.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "item", "qty"]);
        assert_eq!(t.rows[0], vec!["1", "apple", ""]);
        assert_eq!(t.rows[1], vec!["2", "pear", "3"]);
    }

    #[test]
    fn json_non_array_is_parse_error() {
        let err = parse_json("x", br#"{"id": 1}"#).unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[test]
    fn json_array_of_scalars_is_parse_error() {
        let err = parse_json("x", b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    // ── Parquet ───────────────────────────────────────────────────────────────

    fn parquet_fixture() -> Vec<u8> {
        use std::sync::Arc;

        use parquet::data_type::{ByteArray, ByteArrayType, Int64Type};
        use parquet::file::properties::WriterProperties;
        use parquet::file::writer::SerializedFileWriter;
        use parquet::schema::parser::parse_message_type;

        let schema = Arc::new(
            parse_message_type(
                "message metrics { required binary region (UTF8); required int64 amount; }",
            )
            .unwrap(),
        );
        let props = Arc::new(WriterProperties::builder().build());
        let mut buf = Vec::new();
        let mut writer = SerializedFileWriter::new(&mut buf, schema, props).unwrap();
        let mut group = writer.next_row_group().unwrap();

        let mut col = group.next_column().unwrap().unwrap();
        col.typed::<ByteArrayType>()
            .write_batch(
                &[ByteArray::from("north"), ByteArray::from("south"), ByteArray::from("east")],
                None,
                None,
            )
            .unwrap();
        col.close().unwrap();

        let mut col = group.next_column().unwrap().unwrap();
        col.typed::<Int64Type>().write_batch(&[10, 20, 30], None, None).unwrap();
        col.close().unwrap();

        group.close().unwrap();
        writer.close().unwrap();
        buf
    }

    #[tokio::test]
    async fn parquet_source_yields_one_table_with_matching_shape() {
        let store = MemoryStore::new();
        store.insert("s3://b/metrics.parquet", parquet_fixture());
        let outcome = normalize(&sources(&[("x", "s3://b/metrics.parquet")]), &store).await;
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.tables.names(), vec!["x"]);
        let t = outcome.tables.get("x").unwrap();
        assert_eq!(t.column_count(), 2);
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.columns[0].name, "region");
        assert_eq!(t.columns[1].dtype, ColumnType::Numeric);
        assert_eq!(t.rows[0], vec!["north", "10"]);
    }

    #[test]
    fn corrupt_parquet_is_parse_error() {
        let err = parse_parquet("x", Bytes::from_static(b"not a parquet file")).unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    // ── Batch behaviour ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn single_csv_source_yields_one_table_with_logical_name() {
        let store = MemoryStore::new();
        store.insert("s3://b/data.csv", &b"a,b\n1,2\n"[..]);
        let outcome = normalize(&sources(&[("x", "s3://b/data.csv")]), &store).await;
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.tables.names(), vec!["x"]);
        assert_eq!(outcome.tables.get("x").unwrap().row_count(), 1);
    }

    #[tokio::test]
    async fn unsupported_extension_is_reported_not_fatal() {
        let store = MemoryStore::new();
        store.insert("s3://b/ok.csv", &b"a\n1\n"[..]);
        let outcome = normalize(
            &sources(&[("bad", "s3://b/notes.txt"), ("ok", "s3://b/ok.csv")]),
            &store,
        )
        .await;
        assert_eq!(outcome.tables.names(), vec!["ok"]);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0].error,
            IngestError::UnsupportedFormat { ref extension, .. } if extension == "txt"
        ));
    }

    #[tokio::test]
    async fn fetch_failure_is_scoped_to_its_source() {
        let store = MemoryStore::new();
        store.insert("s3://b/ok.csv", &b"a\n1\n"[..]);
        let outcome = normalize(
            &sources(&[("missing", "s3://b/gone.csv"), ("ok", "s3://b/ok.csv")]),
            &store,
        )
        .await;
        assert_eq!(outcome.tables.names(), vec!["ok"]);
        assert!(matches!(outcome.failures[0].error, IngestError::SourceLoad { .. }));
        assert_eq!(outcome.failures[0].name, "missing");
    }

    #[tokio::test]
    async fn corrupt_source_is_parse_error_and_batch_continues() {
        let store = MemoryStore::new();
        store.insert("s3://b/bad.json", &b"not json at all"[..]);
        store.insert("s3://b/ok.csv", &b"a\n1\n"[..]);
        let outcome = normalize(
            &sources(&[("bad", "s3://b/bad.json"), ("ok", "s3://b/ok.csv")]),
            &store,
        )
        .await;
        assert_eq!(outcome.tables.names(), vec!["ok"]);
        assert!(matches!(outcome.failures[0].error, IngestError::Parse { .. }));
    }

    #[tokio::test]
    async fn colliding_logical_names_are_suffixed_deterministically() {
        let store = MemoryStore::new();
        store.insert("s3://b/one.csv", &b"a\n1\n"[..]);
        store.insert("s3://b/two.csv", &b"a\n2\n"[..]);
        let run = || async {
            normalize(
                &sources(&[("data", "s3://b/one.csv"), ("data", "s3://b/two.csv")]),
                &store,
            )
            .await
            .tables
            .names()
        };
        assert_eq!(run().await, vec!["data", "data_2"]);
        assert_eq!(run().await, vec!["data", "data_2"]);
    }

    #[tokio::test]
    async fn logical_names_are_snake_cased() {
        let store = MemoryStore::new();
        store.insert("s3://b/d.csv", &b"a\n1\n"[..]);
        let outcome = normalize(&sources(&[("Sales Report", "s3://b/d.csv")]), &store).await;
        assert_eq!(outcome.tables.names(), vec!["sales_report"]);
    }
}
