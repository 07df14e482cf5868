use crate::config::Channel;
use crate::geo::bearing::{destination_point, normalize_bearing};
use crate::geo::projection::GeodeticProjector;
use crate::prelude::{StageError, StageResult};
use crate::processing::smoother::SmoothedTrack;
use crate::telemetry::log::LogManager;
use crate::track::PingRecord;
use std::collections::BTreeMap;

/// Where one ping's beam terminates on the ground.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeExtent {
    /// Position of the ping in the input slice.
    pub index: usize,
    pub record_num: u64,
    pub chunk_id: u32,
    pub range: f64,
    pub ping_bearing: f64,
    pub range_lon: f64,
    pub range_lat: f64,
    pub range_e: f64,
    pub range_n: f64,
}

pub struct RangeExtentEstimator {
    rotation_deg: f64,
    logger: LogManager,
}

impl RangeExtentEstimator {
    pub fn new(channel: Channel, flip: bool, logger: LogManager) -> Self {
        Self {
            rotation_deg: channel.rotation_deg(flip),
            logger,
        }
    }

    /// Beam length per chunk: the chunk's largest sample count times its
    /// sample size, so pings recorded at a shorter range setting are not clipped.
    pub fn chunk_ranges(pings: &[PingRecord]) -> BTreeMap<u32, f64> {
        let mut extents: BTreeMap<u32, (u32, f64)> = BTreeMap::new();
        for ping in pings {
            let entry = extents.entry(ping.chunk_id).or_insert((0, f64::NAN));
            entry.0 = entry.0.max(ping.ping_cnt);
            if ping.pix_m.is_finite() && (entry.1.is_nan() || ping.pix_m > entry.1) {
                entry.1 = ping.pix_m;
            }
        }
        extents
            .into_iter()
            .map(|(chunk_id, (max_cnt, pix_m))| (chunk_id, max_cnt as f64 * pix_m))
            .collect()
    }

    pub fn ping_bearing(&self, cog: f64) -> f64 {
        normalize_bearing(cog + self.rotation_deg)
    }

    /// Range-extent point for every ping whose geometry resolves; rows with
    /// unresolved coordinates are dropped.
    pub fn estimate(
        &self,
        pings: &[PingRecord],
        track: &SmoothedTrack,
        projector: &GeodeticProjector,
    ) -> StageResult<Vec<RangeExtent>> {
        if track.lons.len() != pings.len() || track.cog.len() != pings.len() {
            return Err(StageError::Internal(format!(
                "smoothed track has {} rows for {} pings",
                track.lons.len(),
                pings.len()
            )));
        }
        let ranges = Self::chunk_ranges(pings);

        let mut extents = Vec::with_capacity(pings.len());
        let mut dropped = 0usize;
        for (index, ping) in pings.iter().enumerate() {
            let range = ranges.get(&ping.chunk_id).copied().unwrap_or(f64::NAN);
            let ping_bearing = self.ping_bearing(track.cog[index]);
            let (range_lon, range_lat) =
                destination_point(track.lons[index], track.lats[index], ping_bearing, range);

            if ![range, ping_bearing, range_lon, range_lat]
                .iter()
                .all(|v| v.is_finite())
            {
                dropped += 1;
                continue;
            }
            let (range_e, range_n) = projector.project(range_lon, range_lat)?;
            extents.push(RangeExtent {
                index,
                record_num: ping.record_num,
                chunk_id: ping.chunk_id,
                range,
                ping_bearing,
                range_lon,
                range_lat,
                range_e,
                range_n,
            });
        }

        if dropped > 0 {
            self.logger
                .warn(&format!("dropped {} pings with unresolved range extent", dropped));
        }
        Ok(extents)
    }
}
