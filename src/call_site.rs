//! Call-site identity and hashing
//!
//! A call site is `(file name without path, line)`. File names are compared by
//! the address of their static storage, not by content: every `file!()`
//! expansion for a given source file is expected to resolve to one string
//! constant for the life of the process. Two distinct strings with the same
//! text are therefore two distinct events.

use std::fmt;

/// Identity handle for a call site's file name
///
/// Equality is pointer identity of the underlying `&'static str`.
#[derive(Clone, Copy)]
pub struct FileId(&'static str);

impl FileId {
    /// Wrap a static file name, stripping any leading path
    pub fn new(name: &'static str) -> Self {
        FileId(strip_path(name))
    }

    /// The file name text
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl PartialEq for FileId {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0.as_ptr(), other.0.as_ptr()) && self.0.len() == other.0.len()
    }
}

impl Eq for FileId {}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({:?} @ {:p})", self.0, self.0.as_ptr())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A `(file, line)` pair identifying where an event is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: FileId,
    pub line: u32,
}

impl CallSite {
    pub fn new(file: &'static str, line: u32) -> Self {
        CallSite {
            file: FileId::new(file),
            line,
        }
    }

    /// Registry hash for this call site
    pub fn hash(&self) -> u64 {
        event_hash(self.file.as_str(), self.line)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Everything after the last `/`, as a sub-slice of the input
///
/// Sub-slicing keeps the result inside the original static storage, so the
/// identity of a stripped name is stable across calls.
pub fn strip_path(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Hash a path-stripped file name and line number
///
/// The logical name ends at the first NUL byte, if any. Bytes are folded into
/// a 64-bit accumulator that is rotated left by 7 after every step:
///
/// 1. each full 8-byte little-endian chunk is XORed in;
/// 2. if 5–7 bytes remain, one 4-byte little-endian chunk is XORed in;
/// 3. the last 0–4 bytes are shifted into a `u32` and XORed in;
/// 4. the line number is XORed in.
///
/// Not cryptographic. Only its spread under linear probing matters.
pub fn event_hash(name: &str, line: u32) -> u64 {
    let bytes = name.as_bytes();
    let logical_len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let bytes = &bytes[..logical_len];

    let mut hash: u64 = 0;

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        hash ^= u64::from_le_bytes(word);
        hash = hash.rotate_left(7);
    }

    let mut rest = chunks.remainder();
    if rest.len() > 4 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&rest[..4]);
        hash ^= u64::from(u32::from_le_bytes(word));
        hash = hash.rotate_left(7);
        rest = &rest[4..];
    }

    let interim = rest
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    hash ^= u64::from(interim);
    hash = hash.rotate_left(7);

    hash ^= u64::from(line);
    hash.rotate_left(7)
}
