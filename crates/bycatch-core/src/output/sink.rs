//! Record sinks
//!
//! Append-only JSONL output plus in-memory and discarding sinks.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use bevy_ecs::prelude::*;
use parking_lot::Mutex;

use bycatch_events::SimRecord;

use crate::error::SinkError;

/// Destination for simulation records.
pub trait EventSink: Send + Sync {
    fn write(&mut self, record: &SimRecord) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Writes one JSON record per line.
pub struct JsonlSink {
    writer: BufWriter<File>,
    records: u64,
}

impl JsonlSink {
    /// Create a sink writing to `path`, truncating any existing file
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    pub fn record_count(&self) -> u64 {
        self.records
    }
}

impl EventSink for JsonlSink {
    fn write(&mut self, record: &SimRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.records += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for JsonlSink {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("failed to flush record file: {}", e);
        }
    }
}

/// Collects records in memory. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<SimRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far
    pub fn records(&self) -> Vec<SimRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Records whose tag matches `kind`
    pub fn of_kind(&self, kind: &str) -> Vec<SimRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect()
    }
}

impl EventSink for MemorySink {
    fn write(&mut self, record: &SimRecord) -> Result<(), SinkError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn write(&mut self, _: &SimRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// The active sink. Write failures are logged and counted, never fatal
/// during a tick.
#[derive(Resource)]
pub struct RecordSink {
    sink: Box<dyn EventSink>,
    failures: u64,
}

impl RecordSink {
    pub fn new(sink: Box<dyn EventSink>) -> Self {
        Self { sink, failures: 0 }
    }

    pub fn emit(&mut self, record: SimRecord) {
        if let Err(e) = self.sink.write(&record) {
            self.failures += 1;
            // one warning per burst is enough
            if self.failures == 1 || self.failures % 1000 == 0 {
                tracing::warn!(failures = self.failures, "could not write {} record: {}", record.kind(), e);
            }
        }
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        self.sink.flush()
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl Default for RecordSink {
    fn default() -> Self {
        Self::new(Box::new(NullSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bycatch_events::TickSummary;
    use std::io::{BufRead, BufReader};
    use tempfile::tempdir;

    fn summary(step: u64) -> SimRecord {
        SimRecord::TickSummary(TickSummary {
            step,
            population: 10,
            ..Default::default()
        })
    }

    #[test]
    fn test_jsonl_sink_writes_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        {
            let mut sink = JsonlSink::create(&path).unwrap();
            sink.write(&summary(1)).unwrap();
            sink.write(&summary(2)).unwrap();
            assert_eq!(sink.record_count(), 2);
        }
        let file = File::open(&path).unwrap();
        let lines: Vec<String> = BufReader::new(file).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        let parsed: SimRecord = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(parsed, summary(2));
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let mut record_sink = RecordSink::new(Box::new(sink.clone()));
        record_sink.emit(summary(3));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.of_kind("tick_summary").len(), 1);
        assert!(sink.of_kind("bycatch").is_empty());
        assert_eq!(record_sink.failures(), 0);
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn write(&mut self, _: &SimRecord) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_failures_are_counted_not_fatal() {
        let mut sink = RecordSink::new(Box::new(FailingSink));
        sink.emit(summary(1));
        sink.emit(summary(2));
        assert_eq!(sink.failures(), 2);
    }
}
