//! Tabular CSV exchange between pipeline stages.
//!
//! All interfaces are file-based CSV tables. Readers validate the required
//! header set before parsing a single row, so a table missing a contract
//! column aborts immediately instead of proceeding with defaults. The
//! quantized table and its scale table form one artifact pair and are
//! committed atomically together.

use crate::core::features::FeatureRow;
use crate::ingest::types::TrackPoint;
use crate::quantize::{QuantizedRow, ScaleEntry};
use crate::selection::{SelectedRow, LABEL_COLUMN, SELECTED_FEATURES};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

/// One row of the enriched raw-point table, keeping the input's column
/// names so the table reads as an extension of the raw export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(with = "crate::ingest::types::flexible_timestamp")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "location-lat")]
    pub latitude: f64,
    #[serde(rename = "location-long")]
    pub longitude: f64,
    pub speed: f64,
    pub raw_accel: f64,
    pub point_is_outside: u8,
    pub kde_probability: f64,
    pub kde_prob_day: f64,
    pub kde_prob_night: f64,
    pub kde_prob_adaptive: f64,
    pub kde_home_range: String,
    pub bearing: f64,
    pub turning_angle: f64,
}

impl From<&TrackPoint> for EnrichedRecord {
    fn from(p: &TrackPoint) -> Self {
        Self {
            timestamp: p.timestamp,
            latitude: p.latitude,
            longitude: p.longitude,
            speed: p.speed_m_per_h,
            raw_accel: p.accel,
            point_is_outside: p.is_outside as u8,
            kde_probability: p.density.refined,
            kde_prob_day: p.density.day,
            kde_prob_night: p.density.night,
            kde_prob_adaptive: p.density.adaptive,
            kde_home_range: p.density.bucket.to_string(),
            bearing: p.bearing_deg,
            turning_angle: p.turning_angle_deg,
        }
    }
}

/// Write any serializable row type as a CSV table.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| TableError::IoError(format!("{}: {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| TableError::WriteError(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| TableError::IoError(e.to_string()))?;
    Ok(())
}

/// Read a CSV table after validating that every required column is present.
pub fn read_table<T: DeserializeOwned>(
    path: &Path,
    required_columns: &[&str],
) -> Result<Vec<T>, TableError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| TableError::IoError(format!("{}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| TableError::IoError(e.to_string()))?
        .clone();
    for required in required_columns {
        if !headers.iter().any(|h| h == *required) {
            return Err(TableError::MissingColumn {
                column: required.to_string(),
                path: path.display().to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        rows.push(record.map_err(|e| TableError::BadRecord {
            line: index + 2,
            message: e.to_string(),
        })?);
    }
    Ok(rows)
}

/// Write the enriched raw-point table.
pub fn write_enriched(path: &Path, points: &[TrackPoint]) -> Result<(), TableError> {
    let records: Vec<EnrichedRecord> = points.iter().map(EnrichedRecord::from).collect();
    write_table(path, &records)
}

/// Write the windowed feature table.
pub fn write_features(path: &Path, rows: &[FeatureRow]) -> Result<(), TableError> {
    write_table(path, rows)
}

/// Read a windowed feature table, requiring the selected-feature contract
/// columns and the label.
pub fn read_features(path: &Path) -> Result<Vec<FeatureRow>, TableError> {
    let mut required: Vec<&str> = SELECTED_FEATURES.to_vec();
    required.push(LABEL_COLUMN);
    read_table(path, &required)
}

/// Write the cleaned, feature-selected table.
pub fn write_selected(path: &Path, rows: &[SelectedRow]) -> Result<(), TableError> {
    write_table(path, rows)
}

/// Read a cleaned, feature-selected table.
pub fn read_selected(path: &Path) -> Result<Vec<SelectedRow>, TableError> {
    let mut required: Vec<&str> = SELECTED_FEATURES.to_vec();
    required.push(LABEL_COLUMN);
    read_table(path, &required)
}

/// Write the quantized table and its scale table as one atomic pair.
///
/// Both tables are first written to temporaries in the destination
/// directory and only then renamed into place, scale table last. A failure
/// at any point leaves no half-committed pair: the quantized table without
/// its scales is uninterpretable, and the scales without the table are
/// useless.
pub fn write_quantized_pair(
    quantized_path: &Path,
    scales_path: &Path,
    rows: &[QuantizedRow],
    scales: &[ScaleEntry],
) -> Result<(), TableError> {
    let quantized_tmp = quantized_path.with_extension("csv.tmp");
    let scales_tmp = scales_path.with_extension("csv.tmp");

    // Stage both tables completely before touching the final paths.
    if let Err(e) = write_table(&quantized_tmp, rows).and_then(|_| write_table(&scales_tmp, scales))
    {
        let _ = std::fs::remove_file(&quantized_tmp);
        let _ = std::fs::remove_file(&scales_tmp);
        return Err(e);
    }

    if let Err(e) = std::fs::rename(&quantized_tmp, quantized_path) {
        let _ = std::fs::remove_file(&quantized_tmp);
        let _ = std::fs::remove_file(&scales_tmp);
        return Err(TableError::IoError(e.to_string()));
    }
    if let Err(e) = std::fs::rename(&scales_tmp, scales_path) {
        // The quantized table just committed without its scales; take it
        // back out so no uninterpretable half-pair remains.
        let _ = std::fs::remove_file(quantized_path);
        let _ = std::fs::remove_file(&scales_tmp);
        return Err(TableError::IoError(e.to_string()));
    }
    Ok(())
}

/// Tabular IO errors.
#[derive(Debug)]
pub enum TableError {
    IoError(String),
    WriteError(String),
    MissingColumn { column: String, path: String },
    BadRecord { line: usize, message: String },
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::IoError(e) => write!(f, "IO error: {e}"),
            TableError::WriteError(e) => write!(f, "Write error: {e}"),
            TableError::MissingColumn { column, path } => {
                write!(f, "Required column missing from {path}: {column}")
            }
            TableError::BadRecord { line, message } => {
                write!(f, "Bad record at line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for TableError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::quantize_table;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("trackfeat-output-{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn selected_row(label: u8) -> SelectedRow {
        SelectedRow {
            kde_low_prob_ratio: 0.25,
            kde_prob_min: 0.1,
            dist_to_centroid_mean: 320.0,
            turning_angle_max: 140.0,
            mean_speed: 210.0,
            turning_entropy: 1.8,
            is_outside: label,
        }
    }

    #[test]
    fn test_selected_table_round_trip() {
        let dir = temp_dir("selected");
        let path = dir.join("cleaned.csv");
        let rows = vec![selected_row(0), selected_row(1)];

        write_selected(&path, &rows).unwrap();
        let read_back = read_selected(&path).unwrap();
        assert_eq!(read_back, rows);
    }

    #[test]
    fn test_read_selected_missing_column() {
        let dir = temp_dir("missing");
        let path = dir.join("bad.csv");
        std::fs::write(&path, "kde_low_prob_ratio,is_outside\n0.5,1\n").unwrap();

        match read_selected(&path) {
            Err(TableError::MissingColumn { column, .. }) => {
                assert_eq!(column, "kde_prob_min");
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_quantized_pair_written_together() {
        let dir = temp_dir("pair");
        let quantized_path = dir.join("features_quantized.csv");
        let scales_path = dir.join("quantization_scales.csv");

        let rows = vec![selected_row(0), selected_row(1)];
        let (quantized, scales) = quantize_table(&rows);
        write_quantized_pair(&quantized_path, &scales_path, &quantized, &scales).unwrap();

        assert!(quantized_path.exists());
        assert!(scales_path.exists());

        let scales_back: Vec<ScaleEntry> = read_table(&scales_path, &["feature", "scale"]).unwrap();
        assert_eq!(scales_back.len(), SELECTED_FEATURES.len());
        for (entry, name) in scales_back.iter().zip(SELECTED_FEATURES) {
            assert_eq!(entry.feature, name);
        }
    }

    #[test]
    fn test_enriched_record_column_names() {
        let dir = temp_dir("enriched");
        let path = dir.join("raw_enriched.csv");
        let ts = crate::ingest::types::flexible_timestamp::parse("2021-03-04 10:00:00").unwrap();
        let point = TrackPoint::new(ts, 6.8, -5.3);

        write_enriched(&path, &[point]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let header = content.lines().next().unwrap();
        assert!(header.contains("location-lat"));
        assert!(header.contains("kde_probability"));
        assert!(header.contains("kde_home_range"));
        assert!(header.contains("turning_angle"));
    }
}
