//! Record types for the trajectory pipeline.
//!
//! A raw fix is what the collar reports; a track point is a fix after
//! preprocessing and enrichment. Stages never mutate their input: each
//! produces a new vector of enriched values.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A raw GPS fix as read from the input table.
///
/// Extra input columns are passthrough and ignored by every stage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawFix {
    /// Fix timestamp
    #[serde(with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Latitude in decimal degrees
    #[serde(rename = "location-lat")]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[serde(rename = "location-long")]
    pub longitude: f64,
}

/// Ordinal home-range occupancy bucket from the canonical density score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DensityBucket {
    #[serde(rename = "Very_Low")]
    VeryLow,
    Low,
    Medium,
    High,
}

impl DensityBucket {
    /// Bucket a normalized density score. Cut points follow the home-range
    /// classification: (0, 0.2] very low, (0.2, 0.5] low, (0.5, 0.8]
    /// medium, above that high.
    pub fn from_score(score: f64) -> Self {
        if score <= 0.2 {
            DensityBucket::VeryLow
        } else if score <= 0.5 {
            DensityBucket::Low
        } else if score <= 0.8 {
            DensityBucket::Medium
        } else {
            DensityBucket::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DensityBucket::VeryLow => "Very_Low",
            DensityBucket::Low => "Low",
            DensityBucket::Medium => "Medium",
            DensityBucket::High => "High",
        }
    }
}

impl std::fmt::Display for DensityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-point density scores, one per fitted context.
///
/// Each score is min-max normalized within its own fit, so day and night
/// values are not comparable in absolute terms; only the adaptive selection
/// and each context's own thresholding are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityScores {
    /// Score under the model fit on all points
    pub global: f64,
    /// Canonical score under the inside-only refit
    pub refined: f64,
    /// Score under the day-partition model
    pub day: f64,
    /// Score under the night-partition model
    pub night: f64,
    /// Day or night score, matching the point's own diel bucket
    pub adaptive: f64,
    /// Bucketed canonical score
    pub bucket: DensityBucket,
}

impl Default for DensityScores {
    fn default() -> Self {
        Self {
            global: 0.0,
            refined: 0.0,
            day: 0.0,
            night: 0.0,
            adaptive: 0.0,
            bucket: DensityBucket::VeryLow,
        }
    }
}

/// A fix after preprocessing and enrichment.
///
/// Derived quantities follow the trajectory conventions: the first point of
/// a sequence has no predecessor, so its step/speed/bearing are zero; the
/// second point additionally has turning angle zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Fix timestamp
    pub timestamp: DateTime<Utc>,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Great-circle distance from the previous fix, metres
    pub step_m: f64,
    /// Hours elapsed since the previous fix
    pub elapsed_h: f64,
    /// Step speed in metres per hour
    pub speed_m_per_h: f64,
    /// First difference of speed over elapsed hours
    pub accel: f64,
    /// Forward azimuth from the previous fix, degrees [0, 360)
    pub bearing_deg: f64,
    /// Absolute bearing change, degrees [0, 180]
    pub turning_angle_deg: f64,
    /// Distance to the trajectory centroid, metres
    pub dist_to_centroid_m: f64,
    /// Density scores across fitted contexts
    pub density: DensityScores,
    /// Whether the point lies outside the learned home range
    pub is_outside: bool,
}

impl TrackPoint {
    /// Create a bare track point with all derived fields zeroed.
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            step_m: 0.0,
            elapsed_h: 0.0,
            speed_m_per_h: 0.0,
            accel: 0.0,
            bearing_deg: 0.0,
            turning_angle_deg: 0.0,
            dist_to_centroid_m: 0.0,
            density: DensityScores::default(),
            is_outside: false,
        }
    }

    /// Hour of day at the collar's location.
    pub fn local_hour(&self, tz: Tz) -> u32 {
        self.timestamp.with_timezone(&tz).hour()
    }
}

/// Hour of day of an arbitrary instant at the collar's location.
pub fn local_hour(timestamp: DateTime<Utc>, tz: Tz) -> u32 {
    timestamp.with_timezone(&tz).hour()
}

/// Serde support for the timestamp formats collar exports use: RFC 3339 or
/// the space-separated `YYYY-MM-DD HH:MM:SS[.fff]` form.
pub mod flexible_timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    const SPACE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in SPACE_FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
        None
    }

    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&timestamp.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_cut_points() {
        assert_eq!(DensityBucket::from_score(0.0), DensityBucket::VeryLow);
        assert_eq!(DensityBucket::from_score(0.2), DensityBucket::VeryLow);
        assert_eq!(DensityBucket::from_score(0.35), DensityBucket::Low);
        assert_eq!(DensityBucket::from_score(0.5), DensityBucket::Low);
        assert_eq!(DensityBucket::from_score(0.8), DensityBucket::Medium);
        assert_eq!(DensityBucket::from_score(1.0), DensityBucket::High);
    }

    #[test]
    fn test_timestamp_parsing() {
        assert!(flexible_timestamp::parse("2021-03-04T10:00:00Z").is_some());
        assert!(flexible_timestamp::parse("2021-03-04 10:00:00.000").is_some());
        assert!(flexible_timestamp::parse("2021-03-04 10:00").is_some());
        assert!(flexible_timestamp::parse("yesterday").is_none());

        let a = flexible_timestamp::parse("2021-03-04T10:00:00Z").unwrap();
        let b = flexible_timestamp::parse("2021-03-04 10:00:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_local_hour_follows_timezone() {
        let ts = flexible_timestamp::parse("2021-03-04T23:30:00Z").unwrap();
        let p = TrackPoint::new(ts, 6.8, -5.3);
        assert_eq!(p.local_hour(chrono_tz::UTC), 23);
        assert_eq!(p.local_hour(chrono_tz::Asia::Bangkok), 6);
    }
}
