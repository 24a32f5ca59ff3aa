// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use scroll::{Pread, LE};

use crate::{Error, Result};

/// Little endian cursor over an event log. Every short read is an
/// [`Error::InvalidEventLog`].
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.buf.len()
    }

    fn truncated(&self, field: &str) -> Error {
        Error::InvalidEventLog(format!(
            "failed to read {field} at offset {}: log is truncated",
            self.offset
        ))
    }

    pub fn u8(&mut self, field: &str) -> Result<u8> {
        self.buf
            .gread_with::<u8>(&mut self.offset, LE)
            .map_err(|_| self.truncated(field))
    }

    pub fn u16(&mut self, field: &str) -> Result<u16> {
        self.buf
            .gread_with::<u16>(&mut self.offset, LE)
            .map_err(|_| self.truncated(field))
    }

    pub fn u32(&mut self, field: &str) -> Result<u32> {
        self.buf
            .gread_with::<u32>(&mut self.offset, LE)
            .map_err(|_| self.truncated(field))
    }

    pub fn u64(&mut self, field: &str) -> Result<u64> {
        self.buf
            .gread_with::<u64>(&mut self.offset, LE)
            .map_err(|_| self.truncated(field))
    }

    pub fn bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| self.truncated(field))?;
        let bytes = &self.buf[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }
}
