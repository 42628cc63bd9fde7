//! Run report: an auditable record of what a pipeline run did.
//!
//! Every destructive decision the pipeline makes — noise filtering,
//! outside labeling, artifact removal — is counted here and persisted as
//! JSON next to the outputs, so a run can be reviewed after the fact
//! without re-executing it.

use crate::config::PipelineConfig;
use crate::selection::ArtifactReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Summary of a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Input table the run consumed
    pub input_path: PathBuf,
    /// Raw fixes read from the input
    pub points_read: usize,
    /// Points surviving the noise filter
    pub points_after_filter: usize,
    /// Points labeled outside the home range
    pub points_outside: usize,
    /// Populated feature bins produced
    pub bins_produced: usize,
    /// Artifact-filter outcome
    pub artifacts: Option<ArtifactReport>,
    /// Rows in the final cleaned table
    pub rows_cleaned: usize,
    /// Quantized columns emitted
    pub columns_quantized: usize,
    /// Configuration the run used
    pub config: PipelineConfig,
}

impl RunReport {
    /// Start a report for a new run.
    pub fn new(input_path: &Path, config: &PipelineConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            input_path: input_path.to_path_buf(),
            points_read: 0,
            points_after_filter: 0,
            points_outside: 0,
            bins_produced: 0,
            artifacts: None,
            rows_cleaned: 0,
            columns_quantized: 0,
            config: config.clone(),
        }
    }

    /// Mark the run finished.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Persist the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Human-readable summary for CLI output.
    pub fn summary(&self) -> String {
        let artifacts = self
            .artifacts
            .map(|a| {
                format!(
                    "{} removed ({} positive-label)",
                    a.removed_rows, a.removed_positive_labels
                )
            })
            .unwrap_or_else(|| "not run".to_string());
        format!(
            "Run {}:\n\
             - Fixes read: {}\n\
             - After noise filter: {}\n\
             - Outside home range: {}\n\
             - Feature bins: {}\n\
             - Artifact rows: {}\n\
             - Cleaned rows: {}\n\
             - Quantized columns: {}",
            self.run_id,
            self.points_read,
            self.points_after_filter,
            self.points_outside,
            self.bins_produced,
            artifacts,
            self.rows_cleaned,
            self.columns_quantized,
        )
    }
}
