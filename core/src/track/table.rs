use crate::prelude::{StageError, StageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

/// One row of the smoothed trackline / range-extent table, keyed by `record_num`.
///
/// Serialized field names are the column names of the persisted CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackRow {
    pub record_num: u64,
    pub chunk_id: u32,
    pub ping_cnt: u32,
    pub time_s: f64,
    pub pix_m: f64,
    pub dep_m: f64,
    pub instr_heading: f64,
    pub lons: f64,
    pub lats: f64,
    pub utm_es: f64,
    pub utm_ns: f64,
    pub cog: f64,
    pub range: f64,
    pub ping_bearing: f64,
    pub range_lons: f64,
    pub range_lats: f64,
    pub range_es: f64,
    pub range_ns: f64,
    pub range_cog: f64,
}

impl TrackRow {
    /// Bed depth expressed in intensity samples; unknown or negative depth is 0.
    pub fn depth_samples(&self) -> f64 {
        let samples = self.dep_m / self.pix_m;
        if samples.is_finite() && samples > 0.0 {
            samples
        } else {
            0.0
        }
    }
}

/// Per-ping table shared read-only by every chunk worker.
#[derive(Debug, Clone, Default)]
pub struct TrackTable {
    rows: Vec<TrackRow>,
}

impl TrackTable {
    pub fn new(mut rows: Vec<TrackRow>) -> Self {
        rows.sort_by_key(|row| row.record_num);
        Self { rows }
    }

    pub fn rows(&self) -> &[TrackRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn chunk_ids(&self) -> Vec<u32> {
        self.rows
            .iter()
            .map(|row| row.chunk_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn chunk_rows(&self, chunk_id: u32) -> Vec<TrackRow> {
        self.rows
            .iter()
            .filter(|row| row.chunk_id == chunk_id)
            .cloned()
            .collect()
    }

    /// Writes the table as CSV, replacing `path` only once the write completed.
    pub fn write_csv(&self, path: &Path) -> StageResult<()> {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut staging = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = csv::Writer::from_writer(staging.as_file_mut());
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        staging.as_file_mut().flush()?;
        staging
            .persist(path)
            .map_err(|err| StageError::Io(err.error))?;
        Ok(())
    }

    pub fn load_csv(path: &Path) -> StageResult<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<TrackRow>, csv::Error>>()?;
        Ok(Self::new(rows))
    }
}
