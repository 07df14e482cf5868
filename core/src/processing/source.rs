use std::collections::HashMap;

/// Raw per-ping intensity samples, indexed by slant range.
///
/// Implemented by whatever decodes the sonar recording; chunk workers share
/// one source and only ever read from it.
pub trait IntensitySource: Send + Sync {
    fn ping(&self, record_num: u64) -> Option<&[u8]>;
}

/// Intensity samples held in memory, keyed by `record_num`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIntensity {
    pings: HashMap<u64, Vec<u8>>,
}

impl InMemoryIntensity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record_num: u64, samples: Vec<u8>) {
        self.pings.insert(record_num, samples);
    }

    pub fn len(&self) -> usize {
        self.pings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pings.is_empty()
    }
}

impl FromIterator<(u64, Vec<u8>)> for InMemoryIntensity {
    fn from_iter<I: IntoIterator<Item = (u64, Vec<u8>)>>(iter: I) -> Self {
        Self {
            pings: iter.into_iter().collect(),
        }
    }
}

impl IntensitySource for InMemoryIntensity {
    fn ping(&self, record_num: u64) -> Option<&[u8]> {
        self.pings.get(&record_num).map(Vec::as_slice)
    }
}
