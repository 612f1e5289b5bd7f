//! Scratch output buffer
//!
//! Serializers write into a [`ScratchBuffer`]; the bytes are handed to the
//! caller by value once the write completes. A dropped buffer is released
//! from the ledger like any other intermediate.

use std::io;

use crate::error::{BoundaryError, Result};
use crate::ledger::Tracked;

/// Initial capacity of every scratch buffer
pub(crate) const SCRATCH_CAPACITY: usize = 8192;

pub(crate) struct ScratchBuffer {
    bytes: Vec<u8>,
    _tracked: Tracked,
}

impl ScratchBuffer {
    pub(crate) fn new(tracked: Tracked) -> Self {
        Self {
            bytes: Vec::with_capacity(SCRATCH_CAPACITY),
            _tracked: tracked,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub(crate) fn into_string(self) -> Result<String> {
        String::from_utf8(self.into_bytes())
            .map_err(|e| BoundaryError::Encode(format!("output is not UTF-8: {}", e)))
    }
}

impl io::Write for ScratchBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
