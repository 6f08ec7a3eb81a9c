//! Deduplicated string pool backing the module index.
//!
//! The writer side interns every string once and hands back its table
//! offset. The reader side keeps the whole table in memory and resolves
//! offsets on demand, remembering each string it has already decoded.

use std::sync::Arc;

use fnv::FnvHashMap;
use memchr::memchr;
use parking_lot::Mutex;

use crate::error::{IndexError, Result};

/// Builds the string table while the encoder writes records.
#[derive(Debug)]
pub(crate) struct StringTableBuilder {
    bytes: Vec<u8>,
    offsets: FnvHashMap<String, u32>,
}

impl StringTableBuilder {
    pub(crate) fn new() -> Self {
        // offset 0 is the empty string
        Self {
            bytes: vec![0],
            offsets: FnvHashMap::default(),
        }
    }

    /// Interns a string, returning its table offset.
    pub(crate) fn intern(&mut self, value: &str) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if let Some(&offset) = self.offsets.get(value) {
            return Ok(offset);
        }
        if memchr(0, value.as_bytes()).is_some() {
            return Err(IndexError::format(format!(
                "string {value:?} contains a NUL byte"
            )));
        }

        let offset = u32::try_from(self.bytes.len())
            .map_err(|_| IndexError::format("string table exceeds 4 GiB"))?;
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.push(0);
        self.offsets.insert(value.to_string(), offset);
        Ok(offset)
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Fully loaded string table of an open index.
pub(crate) struct StringTable {
    bytes: Vec<u8>,
    memo: Mutex<FnvHashMap<u32, Arc<str>>>,
}

impl std::fmt::Debug for StringTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StringTable")
            .field("bytes", &self.bytes.len())
            .field("resolved", &self.memo.lock().len())
            .finish()
    }
}

impl StringTable {
    pub(crate) fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.first() != Some(&0) {
            return Err(IndexError::format("truncated string table"));
        }
        Ok(Self {
            bytes,
            memo: Mutex::new(FnvHashMap::default()),
        })
    }

    /// Resolves a table offset to its string.
    pub(crate) fn get(&self, offset: u32) -> Result<Arc<str>> {
        if offset == 0 {
            return Ok(Arc::from(""));
        }
        if let Some(value) = self.memo.lock().get(&offset) {
            return Ok(Arc::clone(value));
        }

        let start = offset as usize;
        let tail = self.bytes.get(start..).filter(|tail| !tail.is_empty()).ok_or_else(|| {
            IndexError::format(format!(
                "string offset {offset} is past the end of the string table ({} bytes)",
                self.bytes.len()
            ))
        })?;
        let end = memchr(0, tail).ok_or_else(|| {
            IndexError::format(format!(
                "reached end of string table reading string at offset {offset}"
            ))
        })?;
        let value = std::str::from_utf8(&tail[..end]).map_err(|error| {
            IndexError::format(format!("string at offset {offset} is not UTF-8: {error}"))
        })?;

        let value: Arc<str> = Arc::from(value);
        self.memo.lock().insert(offset, Arc::clone(&value));
        Ok(value)
    }
}
