//! Kernel density home-range estimation.
//!
//! A Gaussian kernel density model is fit over (latitude, longitude) in
//! coordinate degrees and every point is scored under it, min-max
//! normalized per fit. Four contexts are fit independently: a global pass
//! that labels points inside/outside the home range, an inside-only refit
//! that produces the canonical score, and day/night partition fits whose
//! scores feed the adaptive selection.
//!
//! Bandwidth and threshold are in degree units and empirically chosen for
//! one geographic scale; they come from [`PipelineConfig`], not constants.

use crate::config::PipelineConfig;
use crate::ingest::types::{DensityBucket, DensityScores, TrackPoint};
use chrono_tz::Tz;
use std::f64::consts::PI;
use tracing::{debug, info};

/// A fitted Gaussian kernel density model over 2-D coordinates.
#[derive(Debug, Clone)]
pub struct DensityModel {
    training: Vec<(f64, f64)>,
    bandwidth: f64,
}

impl DensityModel {
    /// Fit a model on training coordinates with the given bandwidth in
    /// coordinate degrees.
    pub fn fit(training: &[(f64, f64)], bandwidth: f64) -> Self {
        Self {
            training: training.to_vec(),
            bandwidth,
        }
    }

    /// Number of training points.
    pub fn len(&self) -> usize {
        self.training.len()
    }

    pub fn is_empty(&self) -> bool {
        self.training.is_empty()
    }

    /// Raw density estimate at a coordinate.
    pub fn density(&self, lat: f64, lon: f64) -> f64 {
        if self.training.is_empty() {
            return 0.0;
        }
        let h2 = self.bandwidth * self.bandwidth;
        let kernel_sum: f64 = self
            .training
            .iter()
            .map(|&(tlat, tlon)| {
                let d2 = (lat - tlat).powi(2) + (lon - tlon).powi(2);
                (-d2 / (2.0 * h2)).exp()
            })
            .sum();
        kernel_sum / (self.training.len() as f64 * 2.0 * PI * h2)
    }

    /// Score a set of coordinates and min-max normalize to [0, 1] across
    /// the scored set. A constant density surface normalizes to all zeros.
    pub fn score_normalized(&self, coords: &[(f64, f64)]) -> Vec<f64> {
        let raw: Vec<f64> = coords
            .iter()
            .map(|&(lat, lon)| self.density(lat, lon))
            .collect();
        min_max_normalize(&raw)
    }
}

/// Min-max normalize a score vector to [0, 1]; a constant vector maps to
/// all zeros rather than dividing by zero.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if values.is_empty() || max <= min {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Enrich track points with density scores across all fitted contexts.
///
/// The returned vector is a new value; the input is not mutated.
pub fn enrich_with_density(
    points: &[TrackPoint],
    config: &PipelineConfig,
    tz: Tz,
) -> Vec<TrackPoint> {
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.latitude, p.longitude)).collect();

    // Global pass: fit on everything, threshold into inside/outside.
    let global_model = DensityModel::fit(&coords, config.kde_bandwidth_deg);
    let global_scores = global_model.score_normalized(&coords);
    let outside: Vec<bool> = global_scores
        .iter()
        .map(|&s| s < config.kde_outside_threshold)
        .collect();
    let outside_count = outside.iter().filter(|&&o| o).count();
    info!(
        points = points.len(),
        outside = outside_count,
        bandwidth = config.kde_bandwidth_deg,
        "global density pass"
    );

    // Refined pass: refit on inside points only, so outlier clusters do not
    // pull the home-range model. Candidate bandwidths are scored for
    // diagnostics; the configured bandwidth is canonical.
    let inside_coords: Vec<(f64, f64)> = coords
        .iter()
        .zip(&outside)
        .filter(|(_, &o)| !o)
        .map(|(&c, _)| c)
        .collect();
    let refined_training: &[(f64, f64)] = if inside_coords.len() < config.kde_min_inside_fit {
        debug!(
            inside = inside_coords.len(),
            "too few inside points for refit, using all points"
        );
        &coords
    } else {
        &inside_coords
    };

    for &bw in &config.kde_candidate_bandwidths_deg {
        if bw == config.kde_bandwidth_deg {
            continue;
        }
        let candidate = DensityModel::fit(refined_training, bw);
        let scores = candidate.score_normalized(&coords);
        let mean = scores.iter().sum::<f64>() / scores.len().max(1) as f64;
        debug!(bandwidth = bw, mean_score = mean, "candidate bandwidth");
    }

    let refined_model = DensityModel::fit(refined_training, config.kde_bandwidth_deg);
    let refined_scores = refined_model.score_normalized(&coords);

    // Temporal passes: independent fits per diel partition, scoring the
    // full stream under each.
    let is_day: Vec<bool> = points
        .iter()
        .map(|p| {
            let hour = p.local_hour(tz);
            (config.day_start_hour..config.day_end_hour).contains(&hour)
        })
        .collect();
    let day_scores = fit_partition(&coords, &outside, &is_day, true, config);
    let night_scores = fit_partition(&coords, &outside, &is_day, false, config);

    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let adaptive = if is_day[i] {
                day_scores[i]
            } else {
                night_scores[i]
            };
            let mut enriched = p.clone();
            enriched.density = DensityScores {
                global: global_scores[i],
                refined: refined_scores[i],
                day: day_scores[i],
                night: night_scores[i],
                adaptive,
                bucket: DensityBucket::from_score(refined_scores[i]),
            };
            enriched.is_outside = outside[i];
            enriched
        })
        .collect()
}

/// Fit one diel partition and score every point under it. A partition too
/// small to support a model yields all zeros.
fn fit_partition(
    coords: &[(f64, f64)],
    outside: &[bool],
    is_day: &[bool],
    want_day: bool,
    config: &PipelineConfig,
) -> Vec<f64> {
    let partition: Vec<usize> = (0..coords.len())
        .filter(|&i| is_day[i] == want_day)
        .collect();

    if partition.len() < config.kde_min_partition_points {
        debug!(
            partition = if want_day { "day" } else { "night" },
            points = partition.len(),
            "partition too small to fit, scoring zeros"
        );
        return vec![0.0; coords.len()];
    }

    let inside: Vec<(f64, f64)> = partition
        .iter()
        .filter(|&&i| !outside[i])
        .map(|&i| coords[i])
        .collect();
    let training: Vec<(f64, f64)> = if inside.len() < config.kde_min_partition_inside {
        partition.iter().map(|&i| coords[i]).collect()
    } else {
        inside
    };

    let model = DensityModel::fit(&training, config.kde_bandwidth_deg);
    model.score_normalized(coords)
}
