//! Configuration for the trackfeat pipeline.
//!
//! All tunables live here rather than as buried constants: the KDE
//! bandwidth/threshold values and the garbage-row predicate are empirical,
//! dataset-specific choices and must stay adjustable per deployment.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for the feature pipeline.
///
/// Input and output paths are deliberately *not* part of the configuration;
/// they are passed at invocation so the transform logic stays decoupled from
/// any particular machine layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Speed floor for the noise filter, in metres per hour. Points at or
    /// below this speed are treated as stationary/duplicate-fix noise.
    pub noise_speed_floor_m_per_h: f64,

    /// Canonical KDE bandwidth, in coordinate degrees.
    pub kde_bandwidth_deg: f64,

    /// Candidate bandwidths evaluated alongside the canonical one.
    pub kde_candidate_bandwidths_deg: Vec<f64>,

    /// Normalized-density threshold below which a point is outside the
    /// home range.
    pub kde_outside_threshold: f64,

    /// Minimum number of inside-labeled points required to refit the
    /// refined KDE model; below this, all points are used.
    pub kde_min_inside_fit: usize,

    /// Minimum points a diel partition needs before a model is fit at all;
    /// smaller partitions score as all zeros.
    pub kde_min_partition_points: usize,

    /// Minimum inside-labeled points within a diel partition; below this,
    /// the whole partition is used for the fit.
    pub kde_min_partition_inside: usize,

    /// Feature bin width in hours.
    pub bin_width_hours: i64,

    /// Resample interval for the sub-sampled streams (rolling variance,
    /// turning entropy), in hours.
    pub resample_interval_hours: i64,

    /// Rolling window size for turning-angle entropy, in resampled samples.
    pub entropy_window: usize,

    /// Local hour at which day starts (inclusive).
    pub day_start_hour: u32,

    /// Local hour at which day ends (exclusive).
    pub day_end_hour: u32,

    /// IANA timezone of the collar deployment, used for diel bucketing.
    pub timezone: String,

    /// Garbage-row predicate: centroid-distance ceiling in metres.
    pub garbage_centroid_m: f64,

    /// Garbage-row predicate: speed ceiling in metres per hour.
    pub garbage_max_speed: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            noise_speed_floor_m_per_h: 5.0,
            kde_bandwidth_deg: 0.01,
            kde_candidate_bandwidths_deg: vec![0.005, 0.01, 0.02],
            kde_outside_threshold: 0.2,
            kde_min_inside_fit: 10,
            kde_min_partition_points: 10,
            kde_min_partition_inside: 5,
            bin_width_hours: 2,
            resample_interval_hours: 1,
            entropy_window: 10,
            day_start_hour: 6,
            day_end_hour: 18,
            timezone: "UTC".to_string(),
            garbage_centroid_m: 0.1,
            garbage_max_speed: 0.0,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the default location, falling back to
    /// defaults when no config file exists.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: PipelineConfig = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trackfeat")
            .join("config.json")
    }

    /// Resolve the configured timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::BadTimezone(self.timezone.clone()))
    }

    /// Check parameter ranges that would make the pipeline degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kde_bandwidth_deg <= 0.0 {
            return Err(ConfigError::BadParameter(
                "kde_bandwidth_deg must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.kde_outside_threshold) {
            return Err(ConfigError::BadParameter(
                "kde_outside_threshold must be in [0, 1]".to_string(),
            ));
        }
        if self.bin_width_hours <= 0 || self.resample_interval_hours <= 0 {
            return Err(ConfigError::BadParameter(
                "bin and resample widths must be positive".to_string(),
            ));
        }
        if self.entropy_window == 0 {
            return Err(ConfigError::BadParameter(
                "entropy_window must be at least 1".to_string(),
            ));
        }
        if self.day_start_hour >= self.day_end_hour || self.day_end_hour > 24 {
            return Err(ConfigError::BadParameter(
                "day hours must satisfy start < end <= 24".to_string(),
            ));
        }
        self.tz()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    BadTimezone(String),
    BadParameter(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::BadTimezone(tz) => write!(f, "Unknown timezone: {tz}"),
            ConfigError::BadParameter(e) => write!(f, "Bad parameter: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
