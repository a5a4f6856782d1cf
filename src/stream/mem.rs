//! An in-memory stream.
//!
//! Implements both [`UvSource`] and [`UvSink`], so a dataset can be written
//! and read back without touching a real codec. Used by the round-trip tests
//! and usable as a reference when writing a codec adapter.

use super::{StreamError, UvHeader, UvRecord, UvSink, UvSource};

#[derive(Debug, Clone, Default)]
pub struct MemoryUv {
    header: Option<UvHeader>,
    records: Vec<UvRecord>,
    cursor: usize,
}

impl MemoryUv {
    pub fn new() -> MemoryUv {
        MemoryUv::default()
    }

    pub fn from_parts(header: UvHeader, records: Vec<UvRecord>) -> MemoryUv {
        MemoryUv {
            header: Some(header),
            records,
            cursor: 0,
        }
    }

    pub fn records(&self) -> &[UvRecord] {
        &self.records
    }

    /// Start the next read from the first record again.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

impl UvSource for MemoryUv {
    fn header(&mut self) -> Result<UvHeader, StreamError> {
        self.header
            .clone()
            .ok_or(StreamError::MissingHeaderItem("header"))
    }

    fn next_record(&mut self) -> Result<Option<UvRecord>, StreamError> {
        let record = self.records.get(self.cursor).cloned();
        if record.is_some() {
            self.cursor += 1;
        }
        Ok(record)
    }
}

impl UvSink for MemoryUv {
    fn exists(&self) -> bool {
        self.header.is_some() || !self.records.is_empty()
    }

    fn clobber(&mut self) -> Result<(), StreamError> {
        self.header = None;
        self.records.clear();
        self.cursor = 0;
        Ok(())
    }

    fn write_header(&mut self, header: &UvHeader) -> Result<(), StreamError> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn write_record(&mut self, record: &UvRecord) -> Result<(), StreamError> {
        if self.header.is_none() {
            return Err(StreamError::Backend(
                "write_header must be called before any records".to_string(),
            ));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn finalise(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}
