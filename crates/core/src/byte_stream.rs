// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable, share-on-copy byte buffer

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A stream of bytes.
///
/// Cloning shares the underlying buffer; the contents are immutable once
/// constructed. This is the payload type carried by `data_read` signals and
/// returned from protocol-handler reads.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteStream {
    data: Arc<[u8]>,
}

impl Default for ByteStream {
    fn default() -> ByteStream {
        ByteStream { data: Arc::new([]) }
    }
}

impl ByteStream {
    pub fn new(data: &[u8]) -> Self {
        Self { data: Arc::from(data) }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data: Arc::from(data) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Decode the buffer as UTF-8, replacing invalid sequences.
    pub fn to_utf8_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl Deref for ByteStream {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl From<&str> for ByteStream {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<&[u8]> for ByteStream {
    fn from(b: &[u8]) -> Self {
        Self::new(b)
    }
}

impl From<Vec<u8>> for ByteStream {
    fn from(v: Vec<u8>) -> Self {
        Self::from_vec(v)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteStream({} bytes)", self.data.len())
    }
}

#[cfg(test)]
#[path = "byte_stream_tests.rs"]
mod tests;
