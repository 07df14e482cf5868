use crate::math::spline::SplineError;
use crate::processing::working_set::ChunkWorkingSet;

/// Common error type for the rectification stages.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("parameterization failure: {0}")]
    ParameterizationFailure(String),
    #[error("chunk {chunk_id} rectification failed: {reason}")]
    ChunkRectification { chunk_id: u32, reason: String },
    #[error("projection error: {0}")]
    Projection(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("track table error: {0}")]
    Table(#[from] csv::Error),
    #[error("raster encoding error: {0}")]
    Raster(#[from] tiff::TiffError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl StageError {
    pub fn chunk(chunk_id: u32, reason: impl Into<String>) -> Self {
        StageError::ChunkRectification {
            chunk_id,
            reason: reason.into(),
        }
    }
}

/// Spline rejections split by their local recovery: a bad parameter is
/// retried on another one, too little geometry falls back to the raw fixes.
impl From<SplineError> for StageError {
    fn from(err: SplineError) -> Self {
        match err {
            SplineError::NonMonotonicParameter { .. } | SplineError::NonFinite { .. } => {
                StageError::ParameterizationFailure(err.to_string())
            }
            SplineError::TooFewPoints { .. } | SplineError::LengthMismatch => {
                StageError::DegenerateGeometry(err.to_string())
            }
        }
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// One step of the per-chunk `load -> correct -> warp` chain.
///
/// Stages take the working set by value and hand it back, so no chunk state
/// lives on the stage itself.
pub trait ChunkStage {
    fn name(&self) -> &'static str;
    fn execute(&self, working: ChunkWorkingSet) -> StageResult<ChunkWorkingSet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spline_rejections_map_to_their_recovery() {
        let retry = StageError::from(SplineError::NonMonotonicParameter { index: 3 });
        assert!(matches!(retry, StageError::ParameterizationFailure(_)));
        assert!(retry.to_string().contains("control point 3"));
        let raw = StageError::from(SplineError::TooFewPoints { have: 2, need: 4 });
        assert!(matches!(raw, StageError::DegenerateGeometry(_)));
    }
}
