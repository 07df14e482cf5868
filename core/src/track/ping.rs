use serde::{Deserialize, Serialize};

/// One decoded sonar ping as handed over by the recording decoder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingRecord {
    pub record_num: u64,
    pub chunk_id: u32,
    /// Seconds elapsed since the start of the recording.
    pub time_s: f64,
    /// Number of intensity samples in the ping.
    pub ping_cnt: u32,
    pub lon: f64,
    pub lat: f64,
    pub utm_e: f64,
    pub utm_n: f64,
    pub instr_heading: f64,
    pub speed_ms: f64,
    /// Depth reported by the instrument.
    pub inst_dep_m: f64,
    /// Bed depth estimated downstream of the instrument; NaN when unknown.
    pub dep_m: f64,
    /// Along-beam footprint of one intensity sample, constant per chunk.
    pub pix_m: f64,
}

impl PingRecord {
    /// Best available bed depth: the estimate if present, else the instrument's.
    pub fn depth_m(&self) -> f64 {
        if self.dep_m.is_finite() {
            self.dep_m
        } else {
            self.inst_dep_m
        }
    }
}
