pub mod chunking;
pub mod ping;
pub mod table;

pub use chunking::assign_chunks;
pub use ping::PingRecord;
pub use table::{TrackRow, TrackTable};
