//! Stage orchestration: raw fixes in, tables out.
//!
//! These functions chain the core stages with no file IO, so the whole
//! transform is exercisable in-memory. The binary wires them to CSV paths.

use crate::config::PipelineConfig;
use crate::core::{
    annotate_angles, bin_points, compute_features, enrich_with_density, preprocess,
    resample_uniform, turning_entropy_series, FeatureRow, PipelineError,
};
use crate::ingest::types::{RawFix, TrackPoint};
use chrono_tz::Tz;
use tracing::info;

/// Preprocess and enrich a raw fix stream: noise filtering, kinematics,
/// bearings and turning angles, density scores and home-range labels.
pub fn enrich_trajectory(
    fixes: &[RawFix],
    config: &PipelineConfig,
    tz: Tz,
) -> Result<Vec<TrackPoint>, PipelineError> {
    let points = preprocess(fixes, config)?;
    info!(
        fixes = fixes.len(),
        points = points.len(),
        "preprocessed trajectory"
    );
    let points = annotate_angles(&points);
    Ok(enrich_with_density(&points, config, tz))
}

/// Reduce an enriched point stream to the windowed feature table.
pub fn build_feature_table(
    points: &[TrackPoint],
    config: &PipelineConfig,
    tz: Tz,
) -> Vec<FeatureRow> {
    let samples = resample_uniform(points, config.resample_interval_hours);
    let entropy = turning_entropy_series(&samples, config.entropy_window);
    let bins = bin_points(points, config.bin_width_hours);
    let rows = compute_features(&bins, &samples, &entropy, config, tz);
    info!(
        bins = rows.len(),
        resampled = samples.len(),
        "built feature table"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::flexible_timestamp;
    use chrono::Duration;

    /// Two days of hourly fixes wandering around a home range.
    fn wandering_fixes() -> Vec<RawFix> {
        let start = flexible_timestamp::parse("2021-03-04 00:00:00").unwrap();
        (0..48)
            .map(|i| RawFix {
                timestamp: start + Duration::hours(i),
                latitude: 6.80 + 0.004 * ((i % 5) as f64),
                longitude: -5.30 - 0.003 * ((i % 7) as f64),
            })
            .collect()
    }

    #[test]
    fn test_enrich_then_reduce() {
        let config = PipelineConfig::default();
        let points = enrich_trajectory(&wandering_fixes(), &config, chrono_tz::UTC).unwrap();
        assert!(points.len() > 30);
        assert!(points.iter().all(|p| p.speed_m_per_h > 5.0));

        let rows = build_feature_table(&points, &config, chrono_tz::UTC);
        assert!(!rows.is_empty());
        for pair in rows.windows(2) {
            assert!(pair[0].bin_start < pair[1].bin_start);
        }
        assert!(rows.iter().all(|r| r.mean_speed > 0.0));
    }

    #[test]
    fn test_insufficient_data_propagates() {
        let start = flexible_timestamp::parse("2021-03-04 00:00:00").unwrap();
        let fixes = vec![
            RawFix {
                timestamp: start,
                latitude: 6.80,
                longitude: -5.30,
            };
            4
        ];
        let config = PipelineConfig::default();
        assert!(matches!(
            enrich_trajectory(&fixes, &config, chrono_tz::UTC),
            Err(PipelineError::InsufficientData { .. })
        ));
    }
}
