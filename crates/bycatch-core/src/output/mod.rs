//! Output
//!
//! Record sinks and run statistics.

pub mod sink;
pub mod stats;

pub use sink::{EventSink, JsonlSink, MemorySink, NullSink, RecordSink};
pub use stats::{RunStats, STATS_FILE_NAME};
