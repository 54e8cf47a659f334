//! BLAKE3 content hasher with streaming support.
//!
//! # Overview
//! The [`Hasher`] reads a byte stream from its beginning in fixed-size
//! chunks and feeds them into an incremental BLAKE3 state. The resulting
//! [`ContentHash`] detects byte-identical files; it says nothing about
//! visual similarity.
//!
//! The hasher always rewinds the stream itself, so a reader that was
//! already partially consumed still hashes its full content.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::HashError;

/// Default read size for streaming hashes (32 KiB).
pub const HASH_CHUNK_SIZE: usize = 32 * 1024;

/// Length of a content hash in bytes.
pub const HASH_LEN: usize = blake3::OUT_LEN;

/// Digest of a complete byte stream.
///
/// Equality compares the raw digest bytes. The hex form from
/// [`ContentHash::to_hex`] is for display and persistence.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hexadecimal form (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    /// Parse the hexadecimal form produced by [`ContentHash::to_hex`].
    ///
    /// # Errors
    ///
    /// Returns [`HashError::InvalidHex`] if the string is not exactly
    /// `2 * HASH_LEN` hex digits.
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        let bytes = decode_hex(hex).ok_or_else(|| HashError::InvalidHex(hex.to_string()))?;
        let bytes: [u8; HASH_LEN] = bytes
            .try_into()
            .map_err(|_| HashError::InvalidHex(hex.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Streaming content hasher.
///
/// # Example
///
/// ```
/// use imgdupe::scanner::Hasher;
/// use std::io::Cursor;
///
/// let hasher = Hasher::new();
/// let a = hasher.hash_reader(&mut Cursor::new(b"same bytes")).unwrap();
/// let b = hasher.hash_reader(&mut Cursor::new(b"same bytes")).unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct Hasher {
    chunk_size: usize,
    allow_empty: bool,
}

impl Hasher {
    /// Create a hasher with the default chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunk_size: HASH_CHUNK_SIZE,
            allow_empty: false,
        }
    }

    /// Create a hasher that reads `chunk_size` bytes at a time.
    ///
    /// A zero chunk size is raised to one byte.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            ..Self::new()
        }
    }

    /// Accept empty streams instead of failing with [`HashError::EmptyStream`].
    #[must_use]
    pub fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Read size used for each chunk.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Whether empty streams hash successfully.
    #[must_use]
    pub fn allows_empty(&self) -> bool {
        self.allow_empty
    }

    /// Hash the entire content of `reader`, starting from position 0.
    ///
    /// # Errors
    ///
    /// - [`HashError::Read`] if seeking or reading fails
    /// - [`HashError::EmptyStream`] if no bytes were read and empty
    ///   streams are not allowed
    pub fn hash_reader<R: Read + Seek + ?Sized>(
        &self,
        reader: &mut R,
    ) -> Result<ContentHash, HashError> {
        reader.seek(SeekFrom::Start(0)).map_err(HashError::Read)?;

        let mut state = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total: u64 = 0;

        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::Read(e)),
            };
            state.update(&buffer[..read]);
            total += read as u64;
        }

        if total == 0 && !self.allow_empty {
            return Err(HashError::EmptyStream);
        }

        let hash = ContentHash(*state.finalize().as_bytes());
        log::trace!("Hashed {} bytes: {}", total, hash);
        Ok(hash)
    }

    /// Hash the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::NotFound`], [`HashError::PermissionDenied`] or
    /// [`HashError::Io`] for file errors, and [`HashError::EmptyStream`]
    /// for empty files when they are not allowed.
    pub fn hash_file<P: AsRef<Path>>(&self, path: P) -> Result<ContentHash, HashError> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| HashError::for_path(path, e))?;
        self.hash_reader(&mut file).map_err(|e| match e {
            HashError::Read(source) => HashError::for_path(path, source),
            other => other,
        })
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    use fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

pub(crate) fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
