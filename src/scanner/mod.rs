//! Scanner module for content hashing and perceptual fingerprinting.
//!
//! This module provides the two independent computations that feed an
//! [`ImageRecord`](crate::record::ImageRecord):
//! - Content hashing with BLAKE3 (byte-exact duplicates)
//! - Perceptual fingerprinting with a difference or mean hash (near duplicates)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`hasher`]: streaming BLAKE3 hasher over any `Read + Seek` source
//! - [`perceptual`]: grayscale decode, resample, and bit-grid signatures
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::scanner::{Fingerprinter, FingerprintConfig, Hasher};
//!
//! let hasher = Hasher::new();
//! let digest = hasher.hash_file("photo.jpg")?;
//! println!("content hash: {}", digest);
//!
//! let fingerprinter = Fingerprinter::new(FingerprintConfig::difference())?;
//! let fingerprint = fingerprinter.fingerprint_path("photo.jpg")?;
//! println!("signature: {}", fingerprint.signature);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod hasher;
pub mod perceptual;

use std::io;
use std::path::{Path, PathBuf};

// Re-export main types
pub use hasher::{ContentHash, Hasher, HASH_CHUNK_SIZE, HASH_LEN};
pub use perceptual::{
    Fingerprint, FingerprintAlgorithm, FingerprintConfig, Fingerprinter, ResampleFilter,
    Signature, SignatureShape, MAX_GRID_SIDE,
};

/// Errors that can occur during content hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred while reading a caller supplied stream.
    #[error("Failed to read stream: {0}")]
    Read(#[source] io::Error),

    /// The stream contained no bytes.
    #[error("Stream is empty")]
    EmptyStream,

    /// A hex string could not be parsed as a content hash.
    #[error("Invalid content hash: {0:?}")]
    InvalidHex(String),
}

impl HashError {
    /// Classify an error raised while opening or reading `path`.
    pub(crate) fn for_path(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// Errors that can occur during perceptual fingerprinting.
#[derive(thiserror::Error, Debug)]
pub enum FingerprintError {
    /// Failed to open the image file.
    #[error("Failed to open image {path}: {source}")]
    Open {
        /// Path of the image
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to read from the image stream before decoding.
    #[error("Failed to read image stream: {0}")]
    Read(#[source] io::Error),

    /// The image format is unsupported or the data is corrupt.
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The decoded image has no pixels.
    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage {
        /// Decoded width
        width: u32,
        /// Decoded height
        height: u32,
    },

    /// The fingerprint configuration cannot produce a signature.
    #[error("Invalid fingerprint configuration: {0}")]
    InvalidConfig(String),

    /// Raw signature data does not match its declared shape.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
}

/// Two signatures cannot be compared because their shape or algorithm differ.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Incompatible signatures: {left} vs {right}")]
pub struct IncompatibleSignature {
    /// Shape of the left-hand signature
    pub left: SignatureShape,
    /// Shape of the right-hand signature
    pub right: SignatureShape,
}
