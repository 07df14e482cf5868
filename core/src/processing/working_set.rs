use crate::config::TileKind;
use crate::prelude::{StageError, StageResult};
use crate::processing::rectify::RectifiedTile;
use crate::processing::source::IntensitySource;
use crate::track::TrackRow;
use ndarray::Array2;

/// Everything one chunk worker carries between stages.
#[derive(Debug, Clone)]
pub struct ChunkWorkingSet {
    pub chunk_id: u32,
    pub kind: TileKind,
    pub rows: Vec<TrackRow>,
    /// `(samples, pings)`: one column per ping, zero padded to the chunk's
    /// largest sample count.
    pub intensity: Array2<u8>,
    /// Pings the source had no samples for; their columns stay zero.
    pub missing_pings: usize,
    pub tile: Option<RectifiedTile>,
}

impl ChunkWorkingSet {
    pub fn load(
        chunk_id: u32,
        kind: TileKind,
        mut rows: Vec<TrackRow>,
        source: &dyn IntensitySource,
    ) -> StageResult<Self> {
        rows.sort_by_key(|row| row.record_num);
        let samples = rows.iter().map(|row| row.ping_cnt as usize).max().unwrap_or(0);
        if rows.is_empty() || samples == 0 {
            return Err(StageError::chunk(chunk_id, "chunk has no intensity samples"));
        }

        let mut intensity = Array2::<u8>::zeros((samples, rows.len()));
        let mut missing_pings = 0;
        for (col, row) in rows.iter().enumerate() {
            let Some(ping) = source.ping(row.record_num) else {
                missing_pings += 1;
                continue;
            };
            for (sample, &value) in ping.iter().take(samples).enumerate() {
                intensity[[sample, col]] = value;
            }
        }

        Ok(Self {
            chunk_id,
            kind,
            rows,
            intensity,
            missing_pings,
            tile: None,
        })
    }

    pub fn ping_count(&self) -> usize {
        self.rows.len()
    }

    pub fn max_samples(&self) -> usize {
        self.intensity.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::source::InMemoryIntensity;

    fn row(record_num: u64, ping_cnt: u32) -> TrackRow {
        TrackRow {
            record_num,
            chunk_id: 0,
            ping_cnt,
            time_s: 0.0,
            pix_m: 0.02,
            dep_m: 0.0,
            instr_heading: 0.0,
            lons: 0.0,
            lats: 0.0,
            utm_es: 0.0,
            utm_ns: 0.0,
            cog: 0.0,
            range: 0.0,
            ping_bearing: 0.0,
            range_lons: 0.0,
            range_lats: 0.0,
            range_es: 0.0,
            range_ns: 0.0,
            range_cog: 0.0,
        }
    }

    #[test]
    fn columns_are_zero_padded_to_longest_ping() {
        let source: InMemoryIntensity = [(1, vec![9; 4]), (0, vec![5; 6])].into_iter().collect();
        let rows = vec![row(1, 4), row(0, 6), row(2, 3)];
        let working =
            ChunkWorkingSet::load(0, TileKind::WaterColumnPresent, rows, &source).unwrap();

        assert_eq!(working.intensity.dim(), (6, 3));
        assert_eq!(working.rows[0].record_num, 0);
        assert_eq!(working.intensity[[5, 0]], 5);
        assert_eq!(working.intensity[[3, 1]], 9);
        assert_eq!(working.intensity[[4, 1]], 0);
        assert_eq!(working.missing_pings, 1);
    }

    #[test]
    fn empty_chunk_is_rejected() {
        let source = InMemoryIntensity::new();
        let err = ChunkWorkingSet::load(4, TileKind::WaterColumnPresent, vec![row(0, 0)], &source)
            .unwrap_err();
        assert!(matches!(err, StageError::ChunkRectification { chunk_id: 4, .. }));
    }
}
