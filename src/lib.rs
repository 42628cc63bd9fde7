//! trackfeat - GPS collar feature engineering for wildlife anomaly detection.
//!
//! This library turns a raw, irregularly sampled stream of animal GPS fixes
//! into a fixed-width numeric feature table, then quantizes that table into
//! an unsigned 32-bit fixed-point representation for deployment on
//! constrained hardware.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           trackfeat                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌────────────┐   ┌─────────┐   ┌─────────────┐  │
//! │  │  Ingest  │──▶│ Trajectory │──▶│ Density │──▶│   Angular   │  │
//! │  │  (CSV)   │   │ (filter)   │   │  (KDE)  │   │ (bearings)  │  │
//! │  └──────────┘   └────────────┘   └─────────┘   └─────────────┘  │
//! │                                                       │          │
//! │  ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌────▼──────┐  │
//! │  │ Quantize │◀──│ Selection  │◀──│ Features │◀──│ Windowing │  │
//! │  │  (u32)   │   │ (+filter)  │   │ (reduce) │   │ (2h bins) │  │
//! │  └──────────┘   └────────────┘   └──────────┘   └───────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stage takes an immutable input value and returns a new output
//! value. The quantized table is only interpretable together with its
//! per-column scale table; the two are always emitted as a pair.
//!
//! # Example
//!
//! ```no_run
//! use trackfeat::{config::PipelineConfig, ingest, pipeline};
//!
//! let config = PipelineConfig::default();
//! let tz = config.tz().expect("valid timezone");
//!
//! let fixes = ingest::read_fixes(std::path::Path::new("collar.csv"))
//!     .expect("readable input");
//! let points = pipeline::enrich_trajectory(&fixes, &config, tz)
//!     .expect("enough points after filtering");
//! let features = pipeline::build_feature_table(&points, &config, tz);
//! ```

pub mod config;
pub mod core;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod quantize;
pub mod report;
pub mod selection;

// Re-export key types at crate root for convenience
pub use config::{ConfigError, PipelineConfig};
pub use core::{FeatureRow, PipelineError};
pub use ingest::{DensityBucket, DensityScores, IngestError, RawFix, TrackPoint};
pub use output::TableError;
pub use quantize::{quantize_table, QuantizedRow, ScaleEntry};
pub use report::RunReport;
pub use selection::{filter_artifacts, select_features, SelectedRow, SELECTED_FEATURES};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
