//! Tabular case source (CSV with `context` and `response` columns).

use std::io::Read;
use std::path::Path;

use super::CaseRow;
use crate::error::{Error, Result};

/// Columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 2] = ["context", "response"];

/// Read every row of a CSV source.
///
/// The header is checked before any row is parsed; extra columns are
/// ignored. A malformed row aborts the whole read, so nothing downstream
/// runs on a partially parsed file.
pub fn read_cases<R: Read>(reader: R) -> Result<Vec<CaseRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::Source(e.to_string()))?
        .clone();

    let position = |name: &str| headers.iter().position(|header| header == name);
    let [context_col, response_col] = REQUIRED_COLUMNS;
    let (context_idx, response_idx) = match (position(context_col), position(response_col)) {
        (Some(context), Some(response)) => (context, response),
        (context, response) => {
            let missing = [(context_col, context), (response_col, response)]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(Error::Schema { missing });
        }
    };

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| Error::Source(e.to_string()))?;
        rows.push(CaseRow {
            context: record.get(context_idx).unwrap_or_default().to_string(),
            response: record.get(response_idx).unwrap_or_default().to_string(),
        });
    }

    tracing::debug!(rows = rows.len(), "Read case rows from CSV");
    Ok(rows)
}

/// Read cases from a CSV file on disk.
pub fn read_cases_from_path(path: impl AsRef<Path>) -> Result<Vec<CaseRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Source(format!("{}: {}", path.display(), e)))?;
    read_cases(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_and_ignores_extra_columns() {
        let csv = "id,context,response,source\n\
                   1,I can't sleep,Try a wind-down routine,forum\n\
                   2,\"Work stress, constant\",Set boundaries,clinic\n";

        let rows = read_cases(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].context, "I can't sleep");
        assert_eq!(rows[1].context, "Work stress, constant");
        assert_eq!(rows[1].response, "Set boundaries");
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "response,context\nListen first,Feeling isolated\n";
        let rows = read_cases(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].context, "Feeling isolated");
        assert_eq!(rows[0].response, "Listen first");
    }

    #[test]
    fn test_empty_cells_become_empty_text() {
        let csv = "context,response\nNo answer recorded,\n";
        let rows = read_cases(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].response, "");
    }

    #[test]
    fn test_missing_columns_are_named() {
        let err = read_cases("context,answer\na,b\n".as_bytes()).unwrap_err();
        match err {
            Error::Schema { missing } => assert_eq!(missing, vec!["response".to_string()]),
            other => panic!("expected schema error, got {:?}", other),
        }

        let err = read_cases("question,answer\na,b\n".as_bytes()).unwrap_err();
        match err {
            Error::Schema { missing } => {
                assert_eq!(missing, vec!["context".to_string(), "response".to_string()])
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_row_is_source_error() {
        let csv = "context,response\nonly one field\n";
        let err = read_cases(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Source(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_header_only_source_yields_no_rows() {
        let rows = read_cases("context,response\n".as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        std::fs::write(&path, "context,response\nGrief,Acknowledge the loss\n").unwrap();

        let rows = read_cases_from_path(&path).unwrap();
        assert_eq!(rows.len(), 1);

        let err = read_cases_from_path(dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }
}
