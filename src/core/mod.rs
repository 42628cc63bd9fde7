//! The numeric pipeline: trajectory preprocessing, density estimation,
//! angular analysis, and windowed feature aggregation.
//!
//! Every stage takes an immutable input value and returns a new output
//! value; nothing is mutated in place across stage boundaries.

pub mod angular;
pub mod density;
pub mod features;
pub mod trajectory;
pub mod windowing;

pub use angular::{annotate_angles, bearing_deg, turning_angle_deg, turning_entropy_series};
pub use density::{enrich_with_density, DensityModel};
pub use features::{compute_features, FeatureRow};
pub use trajectory::{haversine_distance, preprocess, trajectory_centroid};
pub use windowing::{bin_points, resample_uniform, FeatureBin, ResampledSample};

/// Pipeline-stage errors. Degenerate statistical inputs are recovered
/// locally and never surface here; this covers the conditions a run cannot
/// proceed past.
#[derive(Debug)]
pub enum PipelineError {
    /// Too few points survived preprocessing to derive anything.
    InsufficientData { remaining: usize },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::InsufficientData { remaining } => write!(
                f,
                "Insufficient data: {remaining} point(s) remain after noise filtering, need at least 2"
            ),
        }
    }
}

impl std::error::Error for PipelineError {}
