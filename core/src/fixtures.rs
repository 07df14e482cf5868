//! Synthetic surveys shared by the unit tests.

use crate::geo::bearing::destination_point;
use crate::geo::projection::GeodeticProjector;
use crate::track::{assign_chunks, PingRecord};

/// On the zone 16 central meridian, so grid north is true north.
pub const ORIGIN: (f64, f64) = (-87.0, 43.07);
pub const SPACING_M: f64 = 0.1;
pub const PING_INTERVAL_S: f64 = 0.1;

fn ping(
    record_num: u64,
    lon: f64,
    lat: f64,
    ping_cnt: u32,
    pix_m: f64,
    heading: f64,
) -> PingRecord {
    PingRecord {
        record_num,
        chunk_id: 0,
        time_s: record_num as f64 * PING_INTERVAL_S,
        ping_cnt,
        lon,
        lat,
        utm_e: f64::NAN,
        utm_n: f64::NAN,
        instr_heading: heading,
        speed_ms: SPACING_M / PING_INTERVAL_S,
        inst_dep_m: 1.0,
        dep_m: 1.0,
        pix_m,
    }
}

fn finish(mut pings: Vec<PingRecord>, chunk_size: usize) -> (Vec<PingRecord>, GeodeticProjector) {
    let projector = GeodeticProjector::for_position(ORIGIN.0, ORIGIN.1).unwrap();
    for p in pings.iter_mut() {
        let (e, n) = projector.project(p.lon, p.lat).unwrap();
        p.utm_e = e;
        p.utm_n = n;
    }
    assign_chunks(&mut pings, chunk_size);
    (pings, projector)
}

/// `n` noise-free pings along a great circle from [`ORIGIN`].
pub fn straight_survey(
    n: usize,
    chunk_size: usize,
    ping_cnt: u32,
    pix_m: f64,
    heading_deg: f64,
) -> (Vec<PingRecord>, GeodeticProjector) {
    let pings = (0..n)
        .map(|i| {
            let (lon, lat) =
                destination_point(ORIGIN.0, ORIGIN.1, heading_deg, i as f64 * SPACING_M);
            ping(i as u64, lon, lat, ping_cnt, pix_m, heading_deg)
        })
        .collect();
    finish(pings, chunk_size)
}

/// Counter-clockwise half circle around [`ORIGIN`], entering heading east and
/// leaving heading west, so the port beam points into the turn.
pub fn u_turn_survey(
    n: usize,
    radius_m: f64,
    ping_cnt: u32,
    pix_m: f64,
) -> (Vec<PingRecord>, GeodeticProjector) {
    let pings = (0..n)
        .map(|i| {
            let theta = -90.0 + 180.0 * i as f64 / (n - 1) as f64;
            let (lon, lat) = destination_point(ORIGIN.0, ORIGIN.1, 90.0 - theta, radius_m);
            ping(i as u64, lon, lat, ping_cnt, pix_m, (-theta).rem_euclid(360.0))
        })
        .collect();
    finish(pings, n)
}
