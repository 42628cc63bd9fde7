//! Fixed-point quantization of the selected feature table.
//!
//! Each feature column is independently affine-mapped onto the unsigned
//! 32-bit domain. The mapping is only invertible with the per-column scale
//! table, so the quantized table and the scale table are one artifact pair
//! and must always be persisted together.

use crate::selection::{SelectedRow, SELECTED_FEATURES};
use serde::{Deserialize, Serialize};

/// Size of the integer domain minus one: the largest quantized value.
const DOMAIN_MAX: f64 = u32::MAX as f64;

/// Inverse-mapping parameters for one quantized column:
/// `original ≈ quantized * scale + min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleEntry {
    pub feature: String,
    pub scale: f64,
    pub min: f64,
    pub max: f64,
}

impl ScaleEntry {
    /// Reconstruct an original-scale value from its quantized form.
    pub fn dequantize(&self, quantized: u32) -> f64 {
        quantized as f64 * self.scale + self.min
    }
}

/// One row of the quantized feature table. The label column is carried
/// through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedRow {
    pub kde_low_prob_ratio: u32,
    pub kde_prob_min: u32,
    pub dist_to_centroid_mean: u32,
    pub turning_angle_max: u32,
    pub mean_speed: u32,
    pub turning_entropy: u32,
    pub is_outside: u8,
}

/// Quantize one column of values into the u32 domain.
///
/// Non-finite values count as missing: they take the column minimum and so
/// quantize to 0. An all-missing or constant column maps entirely to 0
/// with scale 1.0 — a recognized degenerate case, not an error.
pub fn quantize_column(name: &str, values: &[f64]) -> (Vec<u32>, ScaleEntry) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

    if finite.is_empty() {
        let entry = ScaleEntry {
            feature: name.to_string(),
            scale: 1.0,
            min: 0.0,
            max: 0.0,
        };
        return (vec![0; values.len()], entry);
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let scale = if max != min {
        (max - min) / DOMAIN_MAX
    } else {
        1.0
    };

    let quantized = values
        .iter()
        .map(|&v| {
            let filled = if v.is_finite() { v } else { min };
            ((filled - min) / scale).round() as u32
        })
        .collect();

    let entry = ScaleEntry {
        feature: name.to_string(),
        scale,
        min,
        max,
    };
    (quantized, entry)
}

/// Quantize the selected feature table column by column, re-attaching the
/// label unchanged. Returns the quantized rows together with the scale
/// table that makes them invertible.
pub fn quantize_table(rows: &[SelectedRow]) -> (Vec<QuantizedRow>, Vec<ScaleEntry>) {
    let mut columns: Vec<Vec<u32>> = Vec::with_capacity(SELECTED_FEATURES.len());
    let mut scales: Vec<ScaleEntry> = Vec::with_capacity(SELECTED_FEATURES.len());

    for (index, &name) in SELECTED_FEATURES.iter().enumerate() {
        let values: Vec<f64> = rows.iter().map(|r| r.feature_values()[index]).collect();
        let (quantized, entry) = quantize_column(name, &values);
        columns.push(quantized);
        scales.push(entry);
    }

    let quantized_rows = rows
        .iter()
        .enumerate()
        .map(|(i, row)| QuantizedRow {
            kde_low_prob_ratio: columns[0][i],
            kde_prob_min: columns[1][i],
            dist_to_centroid_mean: columns[2][i],
            turning_angle_max: columns[3][i],
            mean_speed: columns[4][i],
            turning_entropy: columns[5][i],
            is_outside: row.is_outside,
        })
        .collect();

    (quantized_rows, scales)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: [f64; 6], label: u8) -> SelectedRow {
        SelectedRow {
            kde_low_prob_ratio: values[0],
            kde_prob_min: values[1],
            dist_to_centroid_mean: values[2],
            turning_angle_max: values[3],
            mean_speed: values[4],
            turning_entropy: values[5],
            is_outside: label,
        }
    }

    #[test]
    fn test_round_trip_within_one_step() {
        let values = [0.0, 3.75, -12.5, 1e6, 0.001, 42.0, 7.0];
        let (quantized, entry) = quantize_column("mean_speed", &values);
        for (&original, &q) in values.iter().zip(&quantized) {
            let reconstructed = entry.dequantize(q);
            assert!(
                (reconstructed - original).abs() <= entry.scale,
                "{original} -> {q} -> {reconstructed} (scale {})",
                entry.scale
            );
        }
    }

    #[test]
    fn test_extremes_map_to_domain_bounds() {
        let (quantized, entry) = quantize_column("x", &[-5.0, 0.0, 5.0]);
        assert_eq!(quantized[0], 0);
        assert_eq!(quantized[2], u32::MAX);
        assert_eq!(entry.min, -5.0);
        assert_eq!(entry.max, 5.0);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let (quantized, entry) = quantize_column("x", &[2.5, 2.5, 2.5]);
        assert_eq!(quantized, vec![0, 0, 0]);
        assert_eq!(entry.scale, 1.0);
        assert_eq!(entry.min, 2.5);
        assert_eq!(entry.max, 2.5);
        // Inversion still lands exactly on the constant.
        assert_eq!(entry.dequantize(0), 2.5);
    }

    #[test]
    fn test_all_missing_column_is_degenerate_zero() {
        let (quantized, entry) = quantize_column("x", &[f64::NAN, f64::INFINITY]);
        assert_eq!(quantized, vec![0, 0]);
        assert_eq!(entry.scale, 1.0);
        assert_eq!(entry.min, 0.0);
        assert_eq!(entry.max, 0.0);
    }

    #[test]
    fn test_missing_values_quantize_to_zero() {
        let (quantized, _) = quantize_column("x", &[1.0, f64::NAN, 3.0, f64::NEG_INFINITY]);
        assert_eq!(quantized[1], 0);
        assert_eq!(quantized[3], 0);
        assert_eq!(quantized[0], 0);
        assert_eq!(quantized[2], u32::MAX);
    }

    #[test]
    fn test_table_label_passthrough_and_scale_completeness() {
        let rows = vec![
            row([0.1, 0.4, 250.0, 120.0, 300.0, 1.5], 0),
            row([0.9, 0.0, 900.0, 30.0, 80.0, 0.2], 1),
        ];
        let (quantized, scales) = quantize_table(&rows);

        assert_eq!(quantized.len(), 2);
        assert_eq!(quantized[0].is_outside, 0);
        assert_eq!(quantized[1].is_outside, 1);

        let scale_names: Vec<&str> = scales.iter().map(|s| s.feature.as_str()).collect();
        assert_eq!(scale_names, SELECTED_FEATURES);
    }

    #[test]
    fn test_table_round_trip() {
        let rows = vec![
            row([0.1, 0.4, 250.0, 120.0, 300.0, 1.5], 0),
            row([0.9, 0.0, 900.0, 30.0, 80.0, 0.2], 1),
            row([0.5, 0.2, 10.0, 90.0, 150.0, 3.0], 0),
        ];
        let (quantized, scales) = quantize_table(&rows);

        for (qrow, row) in quantized.iter().zip(&rows) {
            let q_values = [
                qrow.kde_low_prob_ratio,
                qrow.kde_prob_min,
                qrow.dist_to_centroid_mean,
                qrow.turning_angle_max,
                qrow.mean_speed,
                qrow.turning_entropy,
            ];
            for ((q, entry), original) in q_values.iter().zip(&scales).zip(row.feature_values()) {
                assert!((entry.dequantize(*q) - original).abs() <= entry.scale);
            }
        }
    }
}
