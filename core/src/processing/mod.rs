pub mod overlap;
pub mod pipeline;
pub mod range_extent;
pub mod rectify;
pub mod slant_range;
pub mod smoother;
pub mod source;
pub mod working_set;

pub use overlap::{OverlapResolution, OverlapResolver};
pub use pipeline::{process_chunk, ChunkOverlap, SurveyPipeline, TrackBuild};
pub use range_extent::{RangeExtent, RangeExtentEstimator};
pub use rectify::{GeoTransform, RectifiedTile, Rectifier};
pub use slant_range::SlantRangeCorrector;
pub use smoother::{SmoothedTrack, SmoothingMode, TrackPoint, TrackSmoother};
pub use source::{InMemoryIntensity, IntensitySource};
pub use working_set::ChunkWorkingSet;
