use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open input '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One data row as read from the input, before any schema checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line number in the input, for diagnostics
    pub line: u64,
    pub values: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, values: Vec<&str>) -> Self {
        Self {
            line,
            values: values.into_iter().map(String::from).collect(),
        }
    }
}

/// Read every row of a comma-separated file.
///
/// The header row, when present, is skipped without being interpreted: the
/// schema is positional. Rows of differing length are returned as-is so the
/// record store can report them against the schema.
pub fn read_rows(path: &Path, has_header: bool) -> Result<Vec<RawRow>, ReaderError> {
    let file = File::open(path).map_err(|e| ReaderError::Open {
        path: path.display().to_string(),
        source: e,
    })?;

    let rows = read_rows_from(file, has_header)?;
    debug!(path = %path.display(), rows = rows.len(), "Read input rows");
    Ok(rows)
}

pub fn read_rows_from<R: Read>(input: R, has_header: bool) -> Result<Vec<RawRow>, ReaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_reader(input);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        rows.push(RawRow {
            line,
            values: record.iter().map(String::from).collect(),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_skipped() {
        let input = "a,b,c\n1,2,3\n4,5,6\n";
        let rows = read_rows_from(input.as_bytes(), true).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values, vec!["1", "2", "3"]);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 3);
    }

    #[test]
    fn test_no_header() {
        let rows = read_rows_from("1,2,3\n".as_bytes(), false).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_quoted_fields() {
        let input = "h1,h2\n\"Timeout, retrying\",\"say \"\"hi\"\"\"\n";
        let rows = read_rows_from(input.as_bytes(), true).unwrap();

        assert_eq!(rows[0].values, vec!["Timeout, retrying", "say \"hi\""]);
    }

    #[test]
    fn test_ragged_rows_are_kept() {
        let input = "a,b,c\n1,2,3\n4,5\n";
        let rows = read_rows_from(input.as_bytes(), true).unwrap();

        assert_eq!(rows[1].values.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let result = read_rows(Path::new("/nonexistent/input.csv"), true);
        assert!(matches!(result, Err(ReaderError::Open { .. })));
    }
}
