//! Image records and duplicate decisions.
//!
//! An [`ImageRecord`] bundles everything needed to compare one image with
//! another: an identifier, the content hash of the raw bytes, the perceptual
//! signature, and the decoded dimensions. Records are built in one step and
//! never change afterwards.
//!
//! [`compare`] decides whether two records are duplicates:
//!
//! 1. byte-identical content is always a duplicate;
//! 2. otherwise the signatures must share algorithm and grid;
//! 3. the fraction of agreeing bits must reach the caller's threshold.
//!
//! # Example
//!
//! ```no_run
//! use imgdupe::record::{compare, ImageRecord};
//! use imgdupe::scanner::{Fingerprinter, Hasher};
//!
//! let hasher = Hasher::new();
//! let fingerprinter = Fingerprinter::default();
//!
//! let a = ImageRecord::from_path("a.jpg", &hasher, &fingerprinter)?;
//! let b = ImageRecord::from_path("b.jpg", &hasher, &fingerprinter)?;
//! if compare(&a, &b, 0.9)? {
//!     println!("{} duplicates {}", a.short_name(), b.short_name());
//! }
//! # Ok::<(), imgdupe::Error>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::scanner::{ContentHash, Fingerprinter, HashError, Hasher, Signature};

/// Fingerprinted image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    identifier: String,
    content_hash: ContentHash,
    signature: Signature,
    source_dimensions: (u32, u32),
}

impl ImageRecord {
    /// Build a record from one seekable stream.
    ///
    /// The stream is hashed in full, then rewound and decoded. The caller
    /// keeps ownership of the stream and is responsible for closing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hash`] if the stream cannot be read or is empty and
    /// [`Error::Fingerprint`] if it does not decode as a supported image.
    pub fn build<R: Read + Seek>(
        identifier: impl Into<String>,
        reader: &mut R,
        hasher: &Hasher,
        fingerprinter: &Fingerprinter,
    ) -> Result<Self> {
        let identifier = identifier.into();
        let content_hash = hasher.hash_reader(reader)?;
        let fingerprint = fingerprinter.fingerprint_reader(BufReader::new(&mut *reader))?;

        log::debug!(
            "Built record for {}: hash {}, {} from {}x{}",
            identifier,
            content_hash,
            fingerprint.signature.shape(),
            fingerprint.source_dimensions.1,
            fingerprint.source_dimensions.0
        );

        Ok(Self {
            identifier,
            content_hash,
            signature: fingerprint.signature,
            source_dimensions: fingerprint.source_dimensions,
        })
    }

    /// Open the file at `path` and build a record identified by its path.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::NotFound`] / [`HashError::PermissionDenied`]
    /// (wrapped in [`Error::Hash`]) if the file cannot be opened, and the
    /// errors of [`ImageRecord::build`] otherwise. Read failures carry the
    /// path, as they do from [`Hasher::hash_file`].
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        hasher: &Hasher,
        fingerprinter: &Fingerprinter,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| HashError::for_path(path, e))?;
        Self::build(path.display().to_string(), &mut file, hasher, fingerprinter).map_err(
            |e| match e {
                Error::Hash(HashError::Read(source)) => HashError::for_path(path, source).into(),
                other => other,
            },
        )
    }

    /// Identifier supplied at build time.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Digest of the raw bytes.
    #[must_use]
    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    /// Perceptual signature.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Decoded `(height, width)` of the source image.
    #[must_use]
    pub fn source_dimensions(&self) -> (u32, u32) {
        self.source_dimensions
    }

    /// Last path component of the identifier, for display.
    #[must_use]
    pub fn short_name(&self) -> &str {
        Path::new(&self.identifier)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.identifier)
    }

    /// Directory portion of the identifier, empty when there is none.
    #[must_use]
    pub fn directory(&self) -> &str {
        Path::new(&self.identifier)
            .parent()
            .and_then(|parent| parent.to_str())
            .unwrap_or("")
    }

    /// Method form of [`compare`].
    ///
    /// # Errors
    ///
    /// See [`compare`].
    pub fn is_duplicate_of(&self, other: &Self, threshold: f64) -> Result<bool> {
        compare(self, other, threshold)
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidThreshold(threshold));
    }
    Ok(())
}

/// Similarity of two records in `[0, 1]`.
///
/// Byte-identical records score `1.0` without looking at their signatures.
///
/// # Errors
///
/// Returns [`Error::IncompatibleSignature`] if the signatures were produced
/// with different algorithms or grids.
pub fn similarity(a: &ImageRecord, b: &ImageRecord) -> Result<f64> {
    if a.content_hash == b.content_hash {
        return Ok(1.0);
    }
    Ok(a.signature.similarity(&b.signature)?)
}

/// Decide whether `a` and `b` are duplicates at `threshold`.
///
/// A threshold of `0` accepts any compatible pair; `1` requires identical
/// signatures.
///
/// # Errors
///
/// - [`Error::InvalidThreshold`] if `threshold` is NaN or outside `[0, 1]`
/// - [`Error::IncompatibleSignature`] if the signatures cannot be compared
pub fn compare(a: &ImageRecord, b: &ImageRecord, threshold: f64) -> Result<bool> {
    check_threshold(threshold)?;
    if a.content_hash == b.content_hash {
        log::trace!("{} and {} are byte-identical", a.identifier, b.identifier);
        return Ok(true);
    }

    let score = a.signature.similarity(&b.signature)?;
    log::trace!(
        "{} vs {}: similarity {:.3} (threshold {:.3})",
        a.identifier,
        b.identifier,
        score,
        threshold
    );
    Ok(score >= threshold)
}
