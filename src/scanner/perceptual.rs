//! Perceptual image fingerprinting for similarity detection.
//!
//! This module provides the [`Fingerprinter`] which reduces an image to a
//! small bit grid ([`Signature`]) that stays stable under resizing, mild
//! recompression, and brightness shifts.
//!
//! # Algorithms
//!
//! - **dHash** ([`FingerprintAlgorithm::Difference`], default): the luma
//!   image is resampled to `rows x (cols + 1)` and each bit records whether
//!   intensity increases from a pixel to its right-hand neighbour.
//! - **aHash** ([`FingerprintAlgorithm::Mean`]): the luma image is resampled
//!   to `rows x cols` and each bit records whether the pixel is brighter
//!   than the grid mean.
//!
//! Comparisons are strict, so equal intensities yield `false`. Signatures
//! carry the algorithm that produced them and refuse to compare across
//! algorithms or grid shapes.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageReader};
use serde::{Deserialize, Serialize};

use super::hasher::{decode_hex, encode_hex};
use super::{FingerprintError, IncompatibleSignature};

/// Largest accepted number of signature rows or columns.
pub const MAX_GRID_SIDE: u32 = 256;

/// Supported perceptual fingerprint algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    /// dHash (Difference Hash) - horizontal gradient direction.
    #[default]
    Difference,
    /// aHash (Average Hash) - brightness relative to the grid mean.
    Mean,
}

impl FingerprintAlgorithm {
    /// Default signature grid `(rows, cols)` for this algorithm.
    #[must_use]
    pub fn default_grid(&self) -> (u32, u32) {
        match self {
            Self::Difference => (9, 7),
            Self::Mean => (8, 8),
        }
    }
}

impl fmt::Display for FingerprintAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Difference => write!(f, "dHash"),
            Self::Mean => write!(f, "aHash"),
        }
    }
}

/// Interpolation filter used when resampling to the sample grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    /// Nearest neighbour.
    Nearest,
    /// Linear (tent) filter.
    Triangle,
    /// Cubic filter.
    CatmullRom,
    /// Gaussian filter.
    Gaussian,
    /// Lanczos with window 3.
    #[default]
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Fingerprint configuration: algorithm, signature grid and filter.
///
/// Records are only comparable when they were produced with the same
/// algorithm and grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Algorithm that derives bits from the sample grid.
    pub algorithm: FingerprintAlgorithm,
    /// Signature rows.
    pub rows: u32,
    /// Signature columns.
    pub cols: u32,
    /// Resampling filter.
    pub filter: ResampleFilter,
}

impl FingerprintConfig {
    /// Configuration for `algorithm` on its default grid.
    #[must_use]
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        let (rows, cols) = algorithm.default_grid();
        Self {
            algorithm,
            rows,
            cols,
            filter: ResampleFilter::default(),
        }
    }

    /// dHash with a 9x7 signature sampled from a 9x8 grid.
    #[must_use]
    pub fn difference() -> Self {
        Self::new(FingerprintAlgorithm::Difference)
    }

    /// aHash with an 8x8 signature.
    #[must_use]
    pub fn mean() -> Self {
        Self::new(FingerprintAlgorithm::Mean)
    }

    /// Override the signature grid.
    #[must_use]
    pub fn with_grid(mut self, rows: u32, cols: u32) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    /// Override the resampling filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ResampleFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Size `(rows, cols)` of the grid the image is resampled to.
    ///
    /// dHash needs one extra column to form `cols` horizontal differences.
    #[must_use]
    pub fn sample_dimensions(&self) -> (u32, u32) {
        match self.algorithm {
            FingerprintAlgorithm::Difference => (self.rows, self.cols + 1),
            FingerprintAlgorithm::Mean => (self.rows, self.cols),
        }
    }

    /// Shape of the signatures this configuration produces.
    #[must_use]
    pub fn signature_shape(&self) -> SignatureShape {
        SignatureShape {
            algorithm: self.algorithm,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Check that the grid holds at least one bit and each side is at
    /// most [`MAX_GRID_SIDE`].
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::InvalidConfig`] for empty or oversized grids.
    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(FingerprintError::InvalidConfig(format!(
                "signature grid must be non-empty, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows > MAX_GRID_SIDE || self.cols > MAX_GRID_SIDE {
            return Err(FingerprintError::InvalidConfig(format!(
                "signature grid sides must be at most {}, got {}x{}",
                MAX_GRID_SIDE, self.rows, self.cols
            )));
        }
        Ok(())
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::difference()
    }
}

/// Algorithm and grid dimensions of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignatureShape {
    /// Algorithm that produced the bits.
    pub algorithm: FingerprintAlgorithm,
    /// Grid rows.
    pub rows: u32,
    /// Grid columns.
    pub cols: u32,
}

impl fmt::Display for SignatureShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}x{}", self.algorithm, self.rows, self.cols)
    }
}

/// Perceptual signature: a `rows x cols` bit grid.
///
/// Bits are packed row-major, most significant bit first. Padding bits in
/// the final byte are always zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SignatureRepr", into = "SignatureRepr")]
pub struct Signature {
    algorithm: FingerprintAlgorithm,
    rows: u32,
    cols: u32,
    bits: Vec<u8>,
}

impl Signature {
    /// Build a signature from row-major booleans.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::InvalidSignature`] if the grid is empty
    /// or `bits.len() != rows * cols`.
    pub fn from_bits(
        algorithm: FingerprintAlgorithm,
        rows: u32,
        cols: u32,
        bits: &[bool],
    ) -> Result<Self, FingerprintError> {
        let len = checked_len(rows, cols)?;
        if bits.len() != len {
            return Err(FingerprintError::InvalidSignature(format!(
                "expected {} bits for {}x{}, got {}",
                len,
                rows,
                cols,
                bits.len()
            )));
        }
        Ok(Self::pack(algorithm, rows, cols, bits.iter().copied()))
    }

    /// Build a signature from packed row-major bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::InvalidSignature`] if the byte count does
    /// not match the grid or padding bits are set.
    pub fn from_packed(
        algorithm: FingerprintAlgorithm,
        rows: u32,
        cols: u32,
        bits: Vec<u8>,
    ) -> Result<Self, FingerprintError> {
        let len = checked_len(rows, cols)?;
        if bits.len() != len.div_ceil(8) {
            return Err(FingerprintError::InvalidSignature(format!(
                "expected {} bytes for {}x{}, got {}",
                len.div_ceil(8),
                rows,
                cols,
                bits.len()
            )));
        }
        let padding = bits.len() * 8 - len;
        if let Some(last) = bits.last() {
            if padding > 0 && last & ((1u8 << padding) - 1) != 0 {
                return Err(FingerprintError::InvalidSignature(
                    "padding bits must be zero".to_string(),
                ));
            }
        }
        Ok(Self {
            algorithm,
            rows,
            cols,
            bits,
        })
    }

    fn pack(
        algorithm: FingerprintAlgorithm,
        rows: u32,
        cols: u32,
        bits: impl IntoIterator<Item = bool>,
    ) -> Self {
        let len = rows as usize * cols as usize;
        let mut packed = vec![0u8; len.div_ceil(8)];
        for (i, bit) in bits.into_iter().enumerate().take(len) {
            if bit {
                packed[i / 8] |= 0x80 >> (i % 8);
            }
        }
        Self {
            algorithm,
            rows,
            cols,
            bits: packed,
        }
    }

    /// Algorithm that produced this signature.
    #[must_use]
    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.algorithm
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Algorithm and grid dimensions.
    #[must_use]
    pub fn shape(&self) -> SignatureShape {
        SignatureShape {
            algorithm: self.algorithm,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Total number of bits (`rows * cols`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Always false for a constructed signature.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bit at `(row, col)`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, row: u32, col: u32) -> Option<bool> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let i = row as usize * self.cols as usize + col as usize;
        Some(self.bits[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Iterate over all bits in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(move |i| self.bits[i / 8] & (0x80 >> (i % 8)) != 0)
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    /// Packed row-major bytes.
    #[must_use]
    pub fn as_packed(&self) -> &[u8] {
        &self.bits
    }

    /// Hex form of the packed bytes.
    #[must_use]
    pub fn to_hex(&self) -> String {
        encode_hex(&self.bits)
    }

    /// Render the grid as rows of `1` and `0`.
    #[must_use]
    pub fn to_grid_string(&self) -> String {
        let mut out = String::with_capacity(self.len() + self.rows as usize);
        for row in 0..self.rows {
            for col in 0..self.cols {
                out.push(if self.get(row, col) == Some(true) { '1' } else { '0' });
            }
            out.push('\n');
        }
        out
    }

    fn check_compatible(&self, other: &Self) -> Result<(), IncompatibleSignature> {
        if self.shape() != other.shape() {
            return Err(IncompatibleSignature {
                left: self.shape(),
                right: other.shape(),
            });
        }
        Ok(())
    }

    /// Number of cells where both signatures agree.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleSignature`] if the shapes or algorithms differ.
    pub fn matching_bits(&self, other: &Self) -> Result<usize, IncompatibleSignature> {
        self.check_compatible(other)?;
        let differing: u32 = self
            .bits
            .iter()
            .zip(&other.bits)
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        Ok(self.len() - differing as usize)
    }

    /// Fraction of agreeing cells, in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`IncompatibleSignature`] if the shapes or algorithms differ.
    pub fn similarity(&self, other: &Self) -> Result<f64, IncompatibleSignature> {
        let matching = self.matching_bits(other)?;
        Ok(matching as f64 / self.len() as f64)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.shape(), self.to_hex())
    }
}

fn checked_len(rows: u32, cols: u32) -> Result<usize, FingerprintError> {
    if rows == 0 || cols == 0 {
        return Err(FingerprintError::InvalidSignature(format!(
            "grid must be non-empty, got {}x{}",
            rows, cols
        )));
    }
    if rows > MAX_GRID_SIDE || cols > MAX_GRID_SIDE {
        return Err(FingerprintError::InvalidSignature(format!(
            "grid sides must be at most {}, got {}x{}",
            MAX_GRID_SIDE, rows, cols
        )));
    }
    Ok(rows as usize * cols as usize)
}

/// Persisted form: explicit dimensions plus hex of the packed bits.
#[derive(Serialize, Deserialize)]
struct SignatureRepr {
    algorithm: FingerprintAlgorithm,
    rows: u32,
    cols: u32,
    bits: String,
}

impl From<Signature> for SignatureRepr {
    fn from(signature: Signature) -> Self {
        Self {
            bits: signature.to_hex(),
            algorithm: signature.algorithm,
            rows: signature.rows,
            cols: signature.cols,
        }
    }
}

impl TryFrom<SignatureRepr> for Signature {
    type Error = FingerprintError;

    fn try_from(repr: SignatureRepr) -> Result<Self, Self::Error> {
        let bits = decode_hex(&repr.bits).ok_or_else(|| {
            FingerprintError::InvalidSignature(format!("invalid hex {:?}", repr.bits))
        })?;
        Self::from_packed(repr.algorithm, repr.rows, repr.cols, bits)
    }
}

/// Result of fingerprinting one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Perceptual signature.
    pub signature: Signature,
    /// Decoded `(height, width)` before resampling.
    pub source_dimensions: (u32, u32),
}

/// Computes perceptual signatures for images.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    config: FingerprintConfig,
}

impl Fingerprinter {
    /// Create a fingerprinter for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::InvalidConfig`] if the grid is empty.
    pub fn new(config: FingerprintConfig) -> Result<Self, FingerprintError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// Algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> FingerprintAlgorithm {
        self.config.algorithm
    }

    /// Fingerprint the image file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Open`] if the file cannot be opened and
    /// [`FingerprintError::Decode`] if it is not a supported image.
    pub fn fingerprint_path<P: AsRef<Path>>(&self, path: P) -> Result<Fingerprint, FingerprintError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FingerprintError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.fingerprint_reader(BufReader::new(file))
    }

    /// Fingerprint an encoded image read from `reader`.
    ///
    /// The reader is rewound to position 0 first and the format is guessed
    /// from its content.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::Read`] if the stream cannot be rewound or
    /// read and [`FingerprintError::Decode`] for unsupported or corrupt data.
    pub fn fingerprint_reader<R: BufRead + Seek>(
        &self,
        mut reader: R,
    ) -> Result<Fingerprint, FingerprintError> {
        reader
            .seek(SeekFrom::Start(0))
            .map_err(FingerprintError::Read)?;
        let image = ImageReader::new(reader)
            .with_guessed_format()
            .map_err(FingerprintError::Read)?
            .decode()
            .map_err(FingerprintError::Decode)?;
        self.fingerprint_image(&image)
    }

    /// Fingerprint an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`FingerprintError::EmptyImage`] if the image has no pixels.
    pub fn fingerprint_image(&self, image: &DynamicImage) -> Result<Fingerprint, FingerprintError> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Err(FingerprintError::EmptyImage { width, height });
        }

        let (sample_rows, sample_cols) = self.config.sample_dimensions();
        let sample = imageops::resize(&luma, sample_cols, sample_rows, self.config.filter.into());

        let signature = match self.config.algorithm {
            FingerprintAlgorithm::Difference => self.difference_bits(&sample),
            FingerprintAlgorithm::Mean => self.mean_bits(&sample),
        };
        log::trace!(
            "Fingerprinted {}x{} image as {}",
            width,
            height,
            signature
        );

        Ok(Fingerprint {
            signature,
            source_dimensions: (height, width),
        })
    }

    fn difference_bits(&self, sample: &GrayImage) -> Signature {
        let FingerprintConfig { rows, cols, .. } = self.config;
        let bits = (0..rows).flat_map(|y| {
            (0..cols).map(move |x| sample.get_pixel(x + 1, y)[0] > sample.get_pixel(x, y)[0])
        });
        Signature::pack(FingerprintAlgorithm::Difference, rows, cols, bits)
    }

    fn mean_bits(&self, sample: &GrayImage) -> Signature {
        let FingerprintConfig { rows, cols, .. } = self.config;
        let sum: u64 = sample.pixels().map(|p| u64::from(p[0])).sum();
        let mean = sum as f64 / (u64::from(rows) * u64::from(cols)) as f64;
        let bits = sample.pixels().map(|p| f64::from(p[0]) > mean);
        Signature::pack(FingerprintAlgorithm::Mean, rows, cols, bits)
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            config: FingerprintConfig::default(),
        }
    }
}
