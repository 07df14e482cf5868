use crate::math::interp::fill_gaps;
use crate::prelude::{ChunkStage, StageResult};
use crate::processing::working_set::ChunkWorkingSet;
use crate::telemetry::log::LogManager;

/// Moves samples from slant-range to horizontal-range indexing under a
/// flat-bottom assumption, discarding the water column.
pub struct SlantRangeCorrector {
    logger: LogManager,
}

impl SlantRangeCorrector {
    pub fn new(logger: LogManager) -> Self {
        Self { logger }
    }

    /// Corrects one ping given its bed depth in samples.
    ///
    /// Sample `i` lands at `round(sqrt(i^2 - d^2))`. Gaps left between landed
    /// samples are linearly interpolated; everything past the deepest
    /// horizontal index stays zero.
    pub fn correct_ping(samples: &[u8], depth_samples: f64) -> Vec<u8> {
        let n = samples.len();
        let depth = if depth_samples.is_finite() && depth_samples > 0.0 {
            depth_samples.round() as usize
        } else {
            0
        };
        if depth >= n {
            return vec![0; n];
        }

        let depth_sq = (depth * depth) as f64;
        let horizontal = |i: usize| ((i * i) as f64 - depth_sq).sqrt().round() as usize;

        let mut corrected = vec![0.0; n];
        let mut filled = vec![false; n];
        for (i, &value) in samples.iter().enumerate().skip(depth) {
            let h = horizontal(i);
            corrected[h] = value as f64;
            filled[h] = true;
        }

        let extent = horizontal(n - 1) + 1;
        fill_gaps(&mut corrected[..extent], &filled[..extent]);
        corrected
            .into_iter()
            .map(|v| v.round().clamp(0.0, u8::MAX as f64) as u8)
            .collect()
    }
}

impl ChunkStage for SlantRangeCorrector {
    fn name(&self) -> &'static str {
        "slant-range"
    }

    fn execute(&self, mut working: ChunkWorkingSet) -> StageResult<ChunkWorkingSet> {
        for (row, mut column) in working.rows.iter().zip(working.intensity.columns_mut()) {
            let samples = column.to_vec();
            let corrected = Self::correct_ping(&samples, row.depth_samples());
            for (dst, value) in column.iter_mut().zip(corrected) {
                *dst = value;
            }
        }
        self.logger.detail(&format!(
            "chunk {} corrected to horizontal range ({} pings)",
            working.chunk_id,
            working.ping_count()
        ));
        Ok(working)
    }
}
