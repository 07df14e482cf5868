//! Georectification core for side-scan sonar recordings.
//!
//! Decoded pings go through trackline smoothing, range-extent placement and
//! overlap removal into a per-ping track table; each chunk of that table is
//! then warped into its own GeoTIFF tile, chunks in parallel.

pub mod config;
pub mod geo;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod raster;
pub mod telemetry;
pub mod track;

#[cfg(test)]
mod fixtures;

pub use config::{SurveyConfig, SurveyContext};
pub use prelude::{ChunkStage, StageError, StageResult};
pub use processing::{InMemoryIntensity, IntensitySource, SurveyPipeline};
pub use telemetry::RunSummary;
pub use track::{assign_chunks, PingRecord, TrackTable};
