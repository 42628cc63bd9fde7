//! Feature selection and artifact-row filtering.
//!
//! The downstream classifier consumes a fixed six-feature subset; that
//! contract is frozen here and validated whenever a feature table is read
//! back from disk. The artifact filter then drops rows that are products
//! of resampling emptiness rather than genuine observations, with a
//! mandatory warning when any positive-label row is caught by the
//! heuristic.

use crate::config::PipelineConfig;
use crate::core::features::FeatureRow;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The classifier's feature contract. Changing this set requires
/// retraining the deployed model.
pub const SELECTED_FEATURES: [&str; 6] = [
    "kde_low_prob_ratio",
    "kde_prob_min",
    "dist_to_centroid_mean",
    "turning_angle_max",
    "mean_speed",
    "turning_entropy",
];

/// Name of the label column, passed through every stage unquantized.
pub const LABEL_COLUMN: &str = "is_outside";

/// One row of the selected feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRow {
    pub kde_low_prob_ratio: f64,
    pub kde_prob_min: f64,
    pub dist_to_centroid_mean: f64,
    pub turning_angle_max: f64,
    pub mean_speed: f64,
    pub turning_entropy: f64,
    pub is_outside: u8,
}

impl SelectedRow {
    /// Feature values in [`SELECTED_FEATURES`] order.
    pub fn feature_values(&self) -> [f64; 6] {
        [
            self.kde_low_prob_ratio,
            self.kde_prob_min,
            self.dist_to_centroid_mean,
            self.turning_angle_max,
            self.mean_speed,
            self.turning_entropy,
        ]
    }
}

/// Project full feature rows onto the selected subset.
pub fn select_features(rows: &[FeatureRow]) -> Vec<SelectedRow> {
    rows.iter()
        .map(|row| SelectedRow {
            kde_low_prob_ratio: row.kde_low_prob_ratio,
            kde_prob_min: row.kde_prob_min,
            dist_to_centroid_mean: row.dist_to_centroid_mean,
            turning_angle_max: row.turning_angle_max,
            mean_speed: row.mean_speed,
            turning_entropy: row.turning_entropy,
            is_outside: row.is_outside,
        })
        .collect()
}

/// Outcome of the artifact filter, for the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    /// Rows before filtering
    pub original_rows: usize,
    /// Rows removed as garbage
    pub removed_rows: usize,
    /// Removed rows that carried a positive label
    pub removed_positive_labels: usize,
}

/// Remove rows that are computational artifacts of resampling.
///
/// A row sitting essentially on the trajectory centroid while reporting
/// zero mean speed is physically implausible; it only arises when a bin's
/// source data was absent and zero-fill defaults dominated the reduction.
/// Surviving rows are returned untouched. If the heuristic catches any
/// positive-label rows, that is surfaced as a warning: a large count means
/// the heuristic is unsafe for this dataset.
pub fn filter_artifacts(
    rows: &[SelectedRow],
    config: &PipelineConfig,
) -> (Vec<SelectedRow>, ArtifactReport) {
    let is_garbage = |row: &SelectedRow| {
        row.dist_to_centroid_mean < config.garbage_centroid_m
            && row.mean_speed <= config.garbage_max_speed
    };

    let removed_positive_labels = rows
        .iter()
        .filter(|r| is_garbage(r) && r.is_outside == 1)
        .count();

    let surviving: Vec<SelectedRow> = rows.iter().filter(|r| !is_garbage(r)).cloned().collect();
    let report = ArtifactReport {
        original_rows: rows.len(),
        removed_rows: rows.len() - surviving.len(),
        removed_positive_labels,
    };

    if report.removed_positive_labels > 0 {
        warn!(
            removed_positive_labels = report.removed_positive_labels,
            removed_rows = report.removed_rows,
            "artifact filter removed positive-label rows; review the garbage heuristic for this dataset"
        );
    } else {
        info!(
            removed_rows = report.removed_rows,
            surviving_rows = surviving.len(),
            "artifact filter pass"
        );
    }

    (surviving, report)
}
