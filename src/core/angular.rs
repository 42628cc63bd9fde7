//! Angular motion: bearings, turning angles, and turning-angle entropy.
//!
//! Bearing is the forward azimuth between consecutive fixes. The turning
//! angle is the absolute shortest bearing change, wrapped into [-180, 180]
//! before taking the absolute value so a 359° → 1° transition reads as 2°,
//! not 358°. Entropy runs over the uniformly resampled stream so the
//! rolling window covers a fixed span of physical time.

use crate::core::windowing::ResampledSample;
use crate::ingest::types::TrackPoint;

/// Histogram bins for turning entropy, spanning [0°, 360°).
const ENTROPY_BINS: usize = 36;

/// Forward azimuth from one coordinate to another, degrees [0, 360).
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    let bearing = y.atan2(x).to_degrees();

    bearing.rem_euclid(360.0)
}

/// Absolute shortest angular difference between two bearings, in [0, 180].
pub fn turning_angle_deg(prev_bearing: f64, bearing: f64) -> f64 {
    let mut diff = bearing - prev_bearing;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff < -180.0 {
        diff += 360.0;
    }
    diff.abs()
}

/// Annotate a filtered point sequence with bearings and turning angles.
///
/// The first point has no predecessor and keeps bearing 0; the first two
/// points have no bearing pair and keep turning angle 0.
pub fn annotate_angles(points: &[TrackPoint]) -> Vec<TrackPoint> {
    let mut annotated = points.to_vec();
    for i in 1..annotated.len() {
        annotated[i].bearing_deg = bearing_deg(
            annotated[i - 1].latitude,
            annotated[i - 1].longitude,
            annotated[i].latitude,
            annotated[i].longitude,
        );
    }
    for i in 2..annotated.len() {
        annotated[i].turning_angle_deg =
            turning_angle_deg(annotated[i - 1].bearing_deg, annotated[i].bearing_deg);
    }
    annotated
}

/// Shannon entropy in bits of a turning-angle sample, over a 36-bin
/// histogram spanning [0°, 360°). Empty samples have entropy 0.
pub fn shannon_entropy_bits(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }

    let mut counts = [0usize; ENTROPY_BINS];
    let mut total = 0usize;
    for &angle in angles {
        if !angle.is_finite() {
            continue;
        }
        let bin = ((angle / 360.0 * ENTROPY_BINS as f64).floor() as isize)
            .clamp(0, ENTROPY_BINS as isize - 1) as usize;
        counts[bin] += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let mut entropy = 0.0;
    for &count in &counts {
        if count > 0 {
            let p = count as f64 / total as f64;
            entropy -= p * p.log2();
        }
    }
    entropy
}

/// Rolling turning-angle entropy over the resampled stream.
///
/// Turning angles are recomputed on the grid (the interpolated coordinates
/// define the grid's own bearings), then a trailing window of up to
/// `window` samples is reduced to entropy at every grid position.
pub fn turning_entropy_series(samples: &[ResampledSample], window: usize) -> Vec<f64> {
    let turning = grid_turning_angles(samples);

    turning
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let start = (i + 1).saturating_sub(window);
            shannon_entropy_bits(&turning[start..=i])
        })
        .collect()
}

/// Turning angles along the resampled grid, same conventions as the raw
/// sequence: first two samples are 0.
fn grid_turning_angles(samples: &[ResampledSample]) -> Vec<f64> {
    let mut bearings = vec![0.0; samples.len()];
    for i in 1..samples.len() {
        bearings[i] = bearing_deg(
            samples[i - 1].latitude,
            samples[i - 1].longitude,
            samples[i].latitude,
            samples[i].longitude,
        );
    }

    let mut turning = vec![0.0; samples.len()];
    for i in 2..samples.len() {
        turning[i] = turning_angle_deg(bearings[i - 1], bearings[i]);
    }
    turning
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::flexible_timestamp;
    use chrono::{DateTime, Duration, Utc};

    fn ts(s: &str) -> DateTime<Utc> {
        flexible_timestamp::parse(s).unwrap()
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        // Due north and due east from the same origin.
        let north = bearing_deg(6.80, -5.30, 6.90, -5.30);
        let east = bearing_deg(6.80, -5.30, 6.80, -5.20);
        let south = bearing_deg(6.90, -5.30, 6.80, -5.30);
        assert!(north.abs() < 0.01);
        assert!((east - 90.0).abs() < 0.5);
        assert!((south - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_bearing_range() {
        let west = bearing_deg(6.80, -5.20, 6.80, -5.30);
        assert!((0.0..360.0).contains(&west));
        assert!((west - 270.0).abs() < 0.5);
    }

    #[test]
    fn test_turning_angle_wraparound() {
        assert!((turning_angle_deg(359.0, 1.0) - 2.0).abs() < 1e-12);
        assert!((turning_angle_deg(1.0, 359.0) - 2.0).abs() < 1e-12);
        assert!((turning_angle_deg(10.0, 190.0) - 180.0).abs() < 1e-12);
        assert_eq!(turning_angle_deg(45.0, 45.0), 0.0);
    }

    #[test]
    fn test_turning_angle_bounded() {
        for prev in [0.0, 90.0, 179.0, 270.0, 359.9] {
            for cur in [0.0, 45.0, 181.0, 300.0, 359.9] {
                let angle = turning_angle_deg(prev, cur);
                assert!((0.0..=180.0).contains(&angle), "{prev} -> {cur} = {angle}");
            }
        }
    }

    #[test]
    fn test_annotate_angles_conventions() {
        let start = ts("2021-03-04 00:00:00");
        // North, north, then a right-angle turn east.
        let coords = [
            (6.80, -5.30),
            (6.81, -5.30),
            (6.82, -5.30),
            (6.82, -5.29),
        ];
        let points: Vec<TrackPoint> = coords
            .iter()
            .enumerate()
            .map(|(i, &(lat, lon))| TrackPoint::new(start + Duration::hours(i as i64), lat, lon))
            .collect();

        let annotated = annotate_angles(&points);
        assert_eq!(annotated[0].bearing_deg, 0.0);
        assert_eq!(annotated[0].turning_angle_deg, 0.0);
        assert_eq!(annotated[1].turning_angle_deg, 0.0);
        assert!(annotated[2].turning_angle_deg.abs() < 0.5);
        assert!((annotated[3].turning_angle_deg - 90.0).abs() < 0.5);
    }

    #[test]
    fn test_entropy_single_valued_window_is_zero() {
        assert_eq!(shannon_entropy_bits(&[]), 0.0);
        assert_eq!(shannon_entropy_bits(&[0.0, 0.0, 0.0]), 0.0);
        // All values in one bin: no uncertainty.
        assert_eq!(shannon_entropy_bits(&[42.0, 43.0, 44.0]), 0.0);
    }

    #[test]
    fn test_entropy_uniform_two_bins_is_one_bit() {
        let entropy = shannon_entropy_bits(&[5.0, 5.0, 105.0, 105.0]);
        assert!((entropy - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_non_negative() {
        let entropy = shannon_entropy_bits(&[0.0, 15.0, 95.0, 170.0, 170.0]);
        assert!(entropy >= 0.0);
    }

    #[test]
    fn test_rolling_entropy_series_length_and_range() {
        let start = ts("2021-03-04 00:00:00");
        let samples: Vec<ResampledSample> = (0..24)
            .map(|i| ResampledSample {
                timestamp: start + Duration::hours(i),
                latitude: 6.80 + 0.01 * ((i % 3) as f64),
                longitude: -5.30 + 0.007 * ((i % 5) as f64),
                speed_m_per_h: 100.0,
                accel: 0.0,
            })
            .collect();

        let entropy = turning_entropy_series(&samples, 10);
        assert_eq!(entropy.len(), samples.len());
        assert!(entropy.iter().all(|&e| e >= 0.0 && e.is_finite()));
        // A zigzagging track accumulates entropy once the window fills.
        assert!(entropy.iter().any(|&e| e > 0.0));
    }
}
