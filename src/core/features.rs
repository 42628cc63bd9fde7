//! Per-bin feature reduction.
//!
//! Each populated time bin is reduced to one fixed-width feature row:
//! motion statistics, spatial dispersion, rolling variance of the
//! resampled sub-streams, density aggregates, angular aggregates, and
//! temporal flags. Every reducer recovers degenerate input locally — a
//! single-point bin has standard deviation 0, an empty ratio population
//! yields 0 — so no non-finite value ever reaches the output table.

use crate::config::PipelineConfig;
use crate::core::windowing::{FeatureBin, ResampledSample};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Rolling-variance window sizes over the resampled stream, in samples.
const SHORT_VAR_WINDOW: usize = 4;
const LONG_VAR_WINDOW: usize = 8;

/// Density thresholds for the low-probability ratio features.
const LOW_PROB_THRESHOLD: f64 = 0.2;
const VERY_LOW_PROB_THRESHOLD: f64 = 0.1;

/// One row of the windowed feature table, keyed by bin start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Start of the bin this row reduces
    #[serde(with = "crate::ingest::types::flexible_timestamp")]
    pub bin_start: chrono::DateTime<chrono::Utc>,

    // Step-length statistics
    pub step_mean: f64,
    pub step_std: f64,
    pub step_max: f64,
    pub step_median: f64,

    /// Mean distance to the trajectory centroid, metres
    pub dist_to_centroid_mean: f64,

    // Rolling variance of the resampled sub-streams
    pub speed_roll_var_4h_mean: f64,
    pub speed_roll_var_8h_mean: f64,
    pub accel_roll_var_4h_mean: f64,
    pub accel_roll_var_8h_mean: f64,

    // Canonical density score statistics
    pub kde_prob_mean: f64,
    pub kde_prob_min: f64,
    pub kde_prob_max: f64,
    pub kde_prob_std: f64,

    // Diel density means
    pub kde_prob_day_mean: f64,
    pub kde_prob_night_mean: f64,
    pub kde_prob_adaptive_mean: f64,

    // Low-density occupancy ratios
    pub kde_low_prob_ratio: f64,
    pub kde_very_low_prob_ratio: f64,

    // Turning-angle statistics
    pub turning_angle_mean: f64,
    pub turning_angle_std: f64,
    pub turning_angle_max: f64,
    pub turning_angle_median: f64,
    pub sharp_turns_ratio: f64,
    pub moderate_turns_ratio: f64,
    pub turning_entropy: f64,

    // Speed statistics
    pub mean_speed: f64,
    pub accel_mean_abs: f64,

    // Temporal flags
    pub hour: u32,
    pub is_night: u8,

    /// Aggregated label: 1 when any point in the bin is outside the home
    /// range. Never quantized.
    pub is_outside: u8,
}

/// Reduce binned points plus the resampled sub-streams into feature rows,
/// one per populated bin, in ascending bin-start order.
pub fn compute_features(
    bins: &[FeatureBin],
    samples: &[ResampledSample],
    entropy: &[f64],
    config: &PipelineConfig,
    tz: Tz,
) -> Vec<FeatureRow> {
    let speeds: Vec<f64> = samples.iter().map(|s| s.speed_m_per_h).collect();
    let accels: Vec<f64> = samples.iter().map(|s| s.accel).collect();
    let speed_var_short = rolling_variance(&speeds, SHORT_VAR_WINDOW);
    let speed_var_long = rolling_variance(&speeds, LONG_VAR_WINDOW);
    let accel_var_short = rolling_variance(&accels, SHORT_VAR_WINDOW);
    let accel_var_long = rolling_variance(&accels, LONG_VAR_WINDOW);

    bins.iter()
        .map(|bin| {
            let steps: Vec<f64> = bin.points.iter().map(|p| p.step_m).collect();
            let centroid: Vec<f64> = bin.points.iter().map(|p| p.dist_to_centroid_m).collect();
            let kde: Vec<f64> = bin.points.iter().map(|p| p.density.refined).collect();
            let kde_day: Vec<f64> = bin.points.iter().map(|p| p.density.day).collect();
            let kde_night: Vec<f64> = bin.points.iter().map(|p| p.density.night).collect();
            let kde_adaptive: Vec<f64> = bin.points.iter().map(|p| p.density.adaptive).collect();
            let turning: Vec<f64> = bin.points.iter().map(|p| p.turning_angle_deg).collect();
            let speed: Vec<f64> = bin.points.iter().map(|p| p.speed_m_per_h).collect();
            let accel_abs: Vec<f64> = bin.points.iter().map(|p| p.accel.abs()).collect();

            let local_hour = crate::ingest::types::local_hour(bin.start, tz);
            let is_night = !(config.day_start_hour..config.day_end_hour).contains(&local_hour);

            FeatureRow {
                bin_start: bin.start,

                step_mean: mean(&steps),
                step_std: std_dev(&steps),
                step_max: max(&steps),
                step_median: median(&steps),

                dist_to_centroid_mean: mean(&centroid),

                speed_roll_var_4h_mean: sub_stream_mean(bin, samples, &speed_var_short),
                speed_roll_var_8h_mean: sub_stream_mean(bin, samples, &speed_var_long),
                accel_roll_var_4h_mean: sub_stream_mean(bin, samples, &accel_var_short),
                accel_roll_var_8h_mean: sub_stream_mean(bin, samples, &accel_var_long),

                kde_prob_mean: mean(&kde),
                kde_prob_min: min(&kde),
                kde_prob_max: max(&kde),
                kde_prob_std: std_dev(&kde),

                kde_prob_day_mean: mean(&kde_day),
                kde_prob_night_mean: mean(&kde_night),
                kde_prob_adaptive_mean: mean(&kde_adaptive),

                kde_low_prob_ratio: ratio(&kde, |v| v < LOW_PROB_THRESHOLD),
                kde_very_low_prob_ratio: ratio(&kde, |v| v < VERY_LOW_PROB_THRESHOLD),

                turning_angle_mean: mean(&turning),
                turning_angle_std: std_dev(&turning),
                turning_angle_max: max(&turning),
                turning_angle_median: median(&turning),
                sharp_turns_ratio: ratio(&turning, |v| v > 90.0),
                moderate_turns_ratio: ratio(&turning, |v| v > 30.0 && v <= 90.0),
                turning_entropy: sub_stream_mean(bin, samples, entropy),

                mean_speed: mean(&speed),
                accel_mean_abs: mean(&accel_abs),

                hour: local_hour,
                is_night: is_night as u8,

                is_outside: bin.points.iter().any(|p| p.is_outside) as u8,
            }
        })
        .collect()
}

/// Sample variance over trailing windows; positions without a full window
/// are 0.
fn rolling_variance(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i + 1 >= window {
                finite_or_zero(Statistics::variance(values[i + 1 - window..=i].iter()))
            } else {
                0.0
            }
        })
        .collect()
}

/// Mean of the sub-stream values whose sample timestamps fall in the bin;
/// 0 when the bin has no sub-stream coverage.
fn sub_stream_mean(bin: &FeatureBin, samples: &[ResampledSample], values: &[f64]) -> f64 {
    let in_bin: Vec<f64> = samples
        .iter()
        .zip(values)
        .filter(|(s, _)| bin.contains(s.timestamp))
        .map(|(_, &v)| v)
        .collect();
    mean(&in_bin)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(Statistics::mean(values.iter()))
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    finite_or_zero(Statistics::std_dev(values.iter()))
}

fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(Statistics::min(values.iter()))
}

fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(Statistics::max(values.iter()))
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(Data::new(values.to_vec()).median())
}

fn ratio(values: &[f64], predicate: impl Fn(f64) -> bool) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|&&v| predicate(v)).count() as f64 / values.len() as f64
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
