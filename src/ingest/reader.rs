//! Schema-validated CSV ingestion of raw collar fixes.
//!
//! The input contract is checked up front: the required columns must be
//! present or the run aborts before any row is parsed. Silently proceeding
//! with substituted defaults would corrupt the feature contract downstream.

use crate::ingest::types::RawFix;
use std::path::Path;

/// Columns the raw fix table must carry. Anything else is passthrough.
pub const REQUIRED_COLUMNS: [&str; 3] = ["timestamp", "location-lat", "location-long"];

/// Read a raw fix table from a CSV file.
pub fn read_fixes(path: &Path) -> Result<Vec<RawFix>, IngestError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| IngestError::IoError(format!("{}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| IngestError::IoError(e.to_string()))?
        .clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(IngestError::MissingColumn(required.to_string()));
        }
    }

    let mut fixes = Vec::new();
    for (index, record) in reader.deserialize::<RawFix>().enumerate() {
        let fix = record.map_err(|e| IngestError::BadRecord {
            // header occupies line 1
            line: index + 2,
            message: e.to_string(),
        })?;
        if !fix.latitude.is_finite() || !fix.longitude.is_finite() {
            return Err(IngestError::BadRecord {
                line: index + 2,
                message: "non-finite coordinate".to_string(),
            });
        }
        fixes.push(fix);
    }

    if fixes.is_empty() {
        return Err(IngestError::EmptyInput(path.display().to_string()));
    }

    Ok(fixes)
}

/// Ingestion errors.
#[derive(Debug)]
pub enum IngestError {
    IoError(String),
    MissingColumn(String),
    BadRecord { line: usize, message: String },
    EmptyInput(String),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::IoError(e) => write!(f, "IO error: {e}"),
            IngestError::MissingColumn(col) => {
                write!(f, "Required column missing from input: {col}")
            }
            IngestError::BadRecord { line, message } => {
                write!(f, "Bad record at line {line}: {message}")
            }
            IngestError::EmptyInput(path) => write!(f, "Input table has no rows: {path}"),
        }
    }
}

impl std::error::Error for IngestError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("trackfeat-reader-{name}.csv"));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_valid_fixes() {
        let path = write_temp_csv(
            "valid",
            "timestamp,location-lat,location-long,collar-id\n\
             2021-03-04 10:00:00,6.82,-5.35,1630\n\
             2021-03-04 11:00:00,6.83,-5.36,1630\n",
        );
        let fixes = read_fixes(&path).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].latitude, 6.82);
        assert_eq!(fixes[1].longitude, -5.36);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let path = write_temp_csv(
            "missing",
            "timestamp,location-lat\n2021-03-04 10:00:00,6.82\n",
        );
        match read_fixes(&path) {
            Err(IngestError::MissingColumn(col)) => assert_eq!(col, "location-long"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_record_reports_line() {
        let path = write_temp_csv(
            "badrec",
            "timestamp,location-lat,location-long\n\
             2021-03-04 10:00:00,6.82,-5.35\n\
             not-a-time,6.83,-5.36\n",
        );
        match read_fixes(&path) {
            Err(IngestError::BadRecord { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected BadRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let path = write_temp_csv("empty", "timestamp,location-lat,location-long\n");
        assert!(matches!(read_fixes(&path), Err(IngestError::EmptyInput(_))));
    }
}
