use crate::error::{BbfError, Result};
use std::borrow::Cow;

/// Placeholder shown in place of a string whose offset is out of bounds
pub const OFFSET_ERROR: &str = "OFFSET_ERR";

/// Append-only table of NUL-terminated UTF-8 strings, addressed by byte offset
///
/// Identical strings are not merged: every [`StringPool::intern`] call appends
/// fresh bytes.
#[derive(Debug, Clone, Default)]
pub struct StringPool {
    bytes: Vec<u8>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a pool loaded from disk
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Append a string and return its offset
    pub fn intern(&mut self, s: &str) -> Result<u32> {
        if s.as_bytes().contains(&0) {
            return Err(BbfError::Validation(format!(
                "String contains a NUL byte: {:?}",
                s
            )));
        }

        // The terminating NUL must stay addressable too
        if u32::try_from(self.bytes.len() + s.len() + 1).is_err() {
            return Err(BbfError::Validation(
                "String pool exceeds 4 GiB of offsets".to_string(),
            ));
        }
        let offset = self.bytes.len() as u32;

        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        Ok(offset)
    }

    /// Look up the string starting at `offset`
    ///
    /// The string runs to the next NUL or to the end of the pool. Invalid
    /// UTF-8 is replaced rather than rejected.
    pub fn lookup(&self, offset: u32) -> Result<Cow<'_, str>> {
        let start = offset as usize;
        if start >= self.bytes.len() {
            return Err(BbfError::InvalidStringOffset {
                offset,
                pool_len: self.bytes.len(),
            });
        }

        let tail = &self.bytes[start..];
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(String::from_utf8_lossy(&tail[..end]))
    }

    /// Like [`StringPool::lookup`], degrading to [`OFFSET_ERROR`] on a bad offset
    pub fn get(&self, offset: u32) -> Cow<'_, str> {
        match self.lookup(offset) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!("{}", err);
                Cow::Borrowed(OFFSET_ERROR)
            }
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Pool size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
