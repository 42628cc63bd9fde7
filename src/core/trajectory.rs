//! Trajectory preprocessing: ordering, step kinematics, and noise filtering.
//!
//! The raw fix stream is sorted by time, step distance/speed are derived,
//! and stationary/duplicate-fix noise is dropped. Acceleration is computed
//! on the filtered sequence: the filter re-indexes the trajectory, so speed
//! differences are taken between surviving neighbours, not original ones.

use crate::config::PipelineConfig;
use crate::core::PipelineError;
use crate::ingest::types::{RawFix, TrackPoint};

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in metres.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Mean coordinate of a point sequence: (latitude, longitude).
pub fn trajectory_centroid(points: &[TrackPoint]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    (lat, lon)
}

/// Preprocess a raw fix stream into an ordered, noise-filtered sequence of
/// track points with step kinematics and centroid distances.
///
/// The first point has no predecessor, so its step, elapsed time and speed
/// are zero; with a positive noise floor it is always removed by the speed
/// filter along with any stationary or duplicate fixes.
pub fn preprocess(
    fixes: &[RawFix],
    config: &PipelineConfig,
) -> Result<Vec<TrackPoint>, PipelineError> {
    let mut ordered: Vec<RawFix> = fixes.to_vec();
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    // Step kinematics on the ordered raw sequence; the noise filter reads
    // these speeds.
    let mut points: Vec<TrackPoint> = Vec::with_capacity(ordered.len());
    for (i, fix) in ordered.iter().enumerate() {
        let mut point = TrackPoint::new(fix.timestamp, fix.latitude, fix.longitude);
        if i > 0 {
            let prev = &ordered[i - 1];
            point.elapsed_h = elapsed_hours(prev.timestamp, fix.timestamp);
            point.step_m =
                haversine_distance(prev.latitude, prev.longitude, fix.latitude, fix.longitude);
            point.speed_m_per_h = if point.elapsed_h > 0.0 {
                point.step_m / point.elapsed_h
            } else {
                0.0
            };
        }
        points.push(point);
    }

    let mut filtered: Vec<TrackPoint> = points
        .into_iter()
        .filter(|p| p.speed_m_per_h > config.noise_speed_floor_m_per_h)
        .collect();

    if filtered.len() < 2 {
        return Err(PipelineError::InsufficientData {
            remaining: filtered.len(),
        });
    }

    // Acceleration between surviving neighbours. Elapsed time must be
    // re-measured here: the retained elapsed_h values still describe the
    // unfiltered sequence.
    for i in 1..filtered.len() {
        let gap_h = elapsed_hours(filtered[i - 1].timestamp, filtered[i].timestamp);
        let accel = if gap_h > 0.0 {
            (filtered[i].speed_m_per_h - filtered[i - 1].speed_m_per_h) / gap_h
        } else {
            0.0
        };
        filtered[i].accel = if accel.is_finite() { accel } else { 0.0 };
    }

    let (centroid_lat, centroid_lon) = trajectory_centroid(&filtered);
    for point in &mut filtered {
        point.dist_to_centroid_m =
            haversine_distance(point.latitude, point.longitude, centroid_lat, centroid_lon);
    }

    Ok(filtered)
}

fn elapsed_hours(from: chrono::DateTime<chrono::Utc>, to: chrono::DateTime<chrono::Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 3_600_000.0
}
