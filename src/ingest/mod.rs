//! Input records and CSV ingestion.

pub mod reader;
pub mod types;

pub use reader::{read_fixes, IngestError, REQUIRED_COLUMNS};
pub use types::{DensityBucket, DensityScores, RawFix, TrackPoint};
