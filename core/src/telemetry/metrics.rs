use serde::Serialize;
use std::sync::Mutex;

/// A chunk that lost at least one tile, and why. Reasons from several tile
/// kinds of the same chunk are joined with `; `.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkippedChunk {
    pub chunk_id: u32,
    pub reason: String,
}

/// Counters for one survey run, shared by every chunk worker.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Default)]
struct Metrics {
    pings: usize,
    chunks: usize,
    smoothing_fallbacks: usize,
    overlap_removed: usize,
    dropped_rows: usize,
    tiles_written: usize,
    skipped: Vec<SkippedChunk>,
}

/// Serializable snapshot written next to the tiles as `run_summary.json`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub pings: usize,
    pub chunks: usize,
    pub smoothing_fallbacks: usize,
    pub overlap_removed: usize,
    pub dropped_rows: usize,
    pub tiles_written: usize,
    pub skipped: Vec<SkippedChunk>,
}

impl RunSummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Metrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_track(&self, pings: usize, chunks: usize) {
        self.update(|m| {
            m.pings = pings;
            m.chunks = chunks;
        });
    }

    pub fn record_fallback(&self) {
        self.update(|m| m.smoothing_fallbacks += 1);
    }

    pub fn record_overlap_removed(&self, count: usize) {
        self.update(|m| m.overlap_removed += count);
    }

    pub fn record_dropped_rows(&self, count: usize) {
        self.update(|m| m.dropped_rows += count);
    }

    pub fn record_tile(&self) {
        self.update(|m| m.tiles_written += 1);
    }

    pub fn record_skipped(&self, chunk_id: u32, reason: impl Into<String>) {
        let reason = reason.into();
        self.update(|m| {
            match m.skipped.iter_mut().find(|s| s.chunk_id == chunk_id) {
                Some(entry) => {
                    entry.reason.push_str("; ");
                    entry.reason.push_str(&reason);
                }
                None => m.skipped.push(SkippedChunk { chunk_id, reason }),
            }
        });
    }

    pub fn snapshot(&self) -> RunSummary {
        match self.inner.lock() {
            Ok(m) => {
                let mut skipped = m.skipped.clone();
                skipped.sort_by_key(|s| s.chunk_id);
                RunSummary {
                    pings: m.pings,
                    chunks: m.chunks,
                    smoothing_fallbacks: m.smoothing_fallbacks,
                    overlap_removed: m.overlap_removed,
                    dropped_rows: m.dropped_rows,
                    tiles_written: m.tiles_written,
                    skipped,
                }
            }
            Err(_) => RunSummary {
                pings: 0,
                chunks: 0,
                smoothing_fallbacks: 0,
                overlap_removed: 0,
                dropped_rows: 0,
                tiles_written: 0,
                skipped: Vec::new(),
            },
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
