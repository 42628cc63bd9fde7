//! Time alignment: fixed-width feature bins and the uniform sub-sampled
//! grid.
//!
//! Feature bins are left-closed, epoch-aligned intervals keyed by bin
//! start; only populated bins exist — gaps in the fix stream produce no
//! fabricated rows. The resampled grid linearly interpolates the point
//! stream onto a regular interval so rolling statistics keep a consistent
//! physical meaning despite irregular raw sampling.

use crate::ingest::types::TrackPoint;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A time bin containing the track points that fall inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBin {
    /// Start of the bin (inclusive)
    pub start: DateTime<Utc>,
    /// End of the bin (exclusive)
    pub end: DateTime<Utc>,
    /// Points whose timestamps fall inside the bin
    pub points: Vec<TrackPoint>,
}

impl FeatureBin {
    /// Check if a timestamp falls within this bin.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Number of points in the bin.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Floor a timestamp to an epoch-aligned interval boundary.
pub fn floor_to_interval(timestamp: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let width = interval.num_seconds();
    let secs = timestamp.timestamp();
    Utc.timestamp_opt(secs - secs.rem_euclid(width), 0).unwrap()
}

/// Group an ordered point stream into epoch-aligned, left-closed bins of
/// the given width. Bins with no points are not emitted.
pub fn bin_points(points: &[TrackPoint], bin_width_hours: i64) -> Vec<FeatureBin> {
    let width = Duration::hours(bin_width_hours);
    let mut bins: Vec<FeatureBin> = Vec::new();

    for point in points {
        let start = floor_to_interval(point.timestamp, width);
        match bins.last_mut() {
            Some(bin) if bin.start == start => bin.points.push(point.clone()),
            _ => bins.push(FeatureBin {
                start,
                end: start + width,
                points: vec![point.clone()],
            }),
        }
    }

    bins
}

/// One sample of the uniformly resampled point stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampledSample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_m_per_h: f64,
    pub accel: f64,
}

/// Resample a point stream onto a regular grid.
///
/// Each grid cell takes the mean of the points falling in it; cells with no
/// points are filled by linear interpolation between their populated
/// neighbours. The grid spans from the first to the last fix, so every gap
/// is interior and interpolation always has both endpoints.
pub fn resample_uniform(points: &[TrackPoint], interval_hours: i64) -> Vec<ResampledSample> {
    if points.is_empty() {
        return Vec::new();
    }

    let interval = Duration::hours(interval_hours);
    let grid_start = floor_to_interval(points[0].timestamp, interval);
    let grid_end = floor_to_interval(points[points.len() - 1].timestamp, interval);
    let cells = ((grid_end - grid_start).num_seconds() / interval.num_seconds()) as usize + 1;

    // Per-cell means; None marks an empty cell awaiting interpolation.
    let mut means: Vec<Option<[f64; 4]>> = vec![None; cells];
    let mut cursor = 0usize;
    for cell in 0..cells {
        let cell_start = grid_start + interval * cell as i32;
        let cell_end = cell_start + interval;
        let mut sums = [0.0f64; 4];
        let mut count = 0usize;
        while cursor < points.len() && points[cursor].timestamp < cell_end {
            let p = &points[cursor];
            sums[0] += p.latitude;
            sums[1] += p.longitude;
            sums[2] += p.speed_m_per_h;
            sums[3] += p.accel;
            count += 1;
            cursor += 1;
        }
        if count > 0 {
            means[cell] = Some(sums.map(|s| s / count as f64));
        }
    }

    interpolate_gaps(&mut means);

    means
        .into_iter()
        .enumerate()
        .map(|(cell, values)| {
            let v = values.unwrap_or([0.0; 4]);
            ResampledSample {
                timestamp: grid_start + interval * cell as i32,
                latitude: v[0],
                longitude: v[1],
                speed_m_per_h: v[2],
                accel: v[3],
            }
        })
        .collect()
}

/// Fill interior `None` runs by linear interpolation between the bounding
/// populated cells.
fn interpolate_gaps(means: &mut [Option<[f64; 4]>]) {
    let mut prev_filled: Option<usize> = None;
    let mut cell = 0;
    while cell < means.len() {
        if means[cell].is_some() {
            prev_filled = Some(cell);
            cell += 1;
            continue;
        }
        // Find the run of empty cells and its right bound.
        let run_start = cell;
        while cell < means.len() && means[cell].is_none() {
            cell += 1;
        }
        let (Some(left), true) = (prev_filled, cell < means.len()) else {
            continue;
        };
        let right = cell;
        let left_v = means[left].unwrap();
        let right_v = means[right].unwrap();
        let span = (right - left) as f64;
        for fill in run_start..right {
            let t = (fill - left) as f64 / span;
            let mut v = [0.0f64; 4];
            for (k, slot) in v.iter_mut().enumerate() {
                *slot = left_v[k] + (right_v[k] - left_v[k]) * t;
            }
            means[fill] = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::flexible_timestamp;

    fn ts(s: &str) -> DateTime<Utc> {
        flexible_timestamp::parse(s).unwrap()
    }

    fn point(s: &str, lat: f64, speed: f64) -> TrackPoint {
        let mut p = TrackPoint::new(ts(s), lat, -5.30);
        p.speed_m_per_h = speed;
        p
    }

    #[test]
    fn test_floor_to_interval_epoch_aligned() {
        let floored = floor_to_interval(ts("2021-03-04 13:47:00"), Duration::hours(2));
        assert_eq!(floored, ts("2021-03-04 12:00:00"));
        let floored = floor_to_interval(ts("2021-03-04 13:47:00"), Duration::hours(1));
        assert_eq!(floored, ts("2021-03-04 13:00:00"));
    }

    #[test]
    fn test_bin_points_left_closed() {
        let points = vec![
            point("2021-03-04 10:00:00", 6.80, 100.0),
            point("2021-03-04 11:59:00", 6.81, 100.0),
            point("2021-03-04 12:00:00", 6.82, 100.0),
        ];
        let bins = bin_points(&points, 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].start, ts("2021-03-04 10:00:00"));
        assert_eq!(bins[0].len(), 2);
        assert_eq!(bins[1].start, ts("2021-03-04 12:00:00"));
        assert!(bins[1].contains(ts("2021-03-04 12:00:00")));
        assert!(!bins[1].contains(ts("2021-03-04 14:00:00")));
    }

    #[test]
    fn test_empty_bins_not_fabricated() {
        let points = vec![
            point("2021-03-04 10:30:00", 6.80, 100.0),
            // 8-hour gap
            point("2021-03-04 18:30:00", 6.81, 100.0),
        ];
        let bins = bin_points(&points, 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].start, ts("2021-03-04 10:00:00"));
        assert_eq!(bins[1].start, ts("2021-03-04 18:00:00"));
    }

    #[test]
    fn test_resample_means_and_grid() {
        let points = vec![
            point("2021-03-04 10:10:00", 6.80, 100.0),
            point("2021-03-04 10:50:00", 6.82, 200.0),
            point("2021-03-04 11:20:00", 6.84, 300.0),
        ];
        let samples = resample_uniform(&points, 1);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp, ts("2021-03-04 10:00:00"));
        assert!((samples[0].latitude - 6.81).abs() < 1e-9);
        assert!((samples[0].speed_m_per_h - 150.0).abs() < 1e-9);
        assert_eq!(samples[1].speed_m_per_h, 300.0);
    }

    #[test]
    fn test_resample_interpolates_gaps() {
        let points = vec![
            point("2021-03-04 10:00:00", 6.80, 100.0),
            // hours 11 and 12 empty
            point("2021-03-04 13:00:00", 6.86, 400.0),
        ];
        let samples = resample_uniform(&points, 1);
        assert_eq!(samples.len(), 4);
        assert!((samples[1].latitude - 6.82).abs() < 1e-9);
        assert!((samples[2].latitude - 6.84).abs() < 1e-9);
        assert!((samples[1].speed_m_per_h - 200.0).abs() < 1e-9);
        assert!((samples[2].speed_m_per_h - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample_uniform(&[], 1).is_empty());
    }
}
