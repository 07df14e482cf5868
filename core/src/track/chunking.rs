use crate::track::ping::PingRecord;

/// Assigns `chunk_id`s in record order, `chunk_size` pings per chunk.
///
/// A trailing chunk shorter than half a chunk is folded into the one before
/// it so no tile is built from a handful of pings. Returns the chunk count.
pub fn assign_chunks(pings: &mut [PingRecord], chunk_size: usize) -> usize {
    if pings.is_empty() {
        return 0;
    }
    pings.sort_by_key(|ping| ping.record_num);
    if chunk_size == 0 || pings.len() <= chunk_size {
        pings.iter_mut().for_each(|ping| ping.chunk_id = 0);
        return 1;
    }

    let full = pings.len() / chunk_size;
    let remainder = pings.len() % chunk_size;
    let merge_tail = remainder > 0 && remainder < chunk_size.div_ceil(2);
    let chunk_count = if remainder == 0 || merge_tail {
        full
    } else {
        full + 1
    };

    for (index, ping) in pings.iter_mut().enumerate() {
        ping.chunk_id = (index / chunk_size).min(chunk_count - 1) as u32;
    }
    chunk_count
}
