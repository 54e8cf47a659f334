//! Command-line interface definitions for imgdupe.
//!
//! # Example
//!
//! ```bash
//! # Print the record of each image as a JSON line
//! imgdupe fingerprint photos/*.jpg
//!
//! # Decide whether two images are near duplicates
//! imgdupe compare original.jpg resized.jpg --threshold 90%
//!
//! # Show the effective configuration
//! imgdupe -v config
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scanner::FingerprintAlgorithm;

/// Perceptual image fingerprints and near-duplicate detection.
#[derive(Debug, Parser)]
#[command(name = "imgdupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE", global = true, env = "IMGDUPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute image records and print them as JSON
    Fingerprint(FingerprintArgs),
    /// Compare two images
    Compare(CompareArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Fingerprint algorithm selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    /// Difference hash (9x7 bits)
    Difference,
    /// Mean hash (8x8 bits)
    Mean,
}

impl From<AlgorithmArg> for FingerprintAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Difference => FingerprintAlgorithm::Difference,
            AlgorithmArg::Mean => FingerprintAlgorithm::Mean,
        }
    }
}

/// Options shared by commands that build records.
#[derive(Debug, Clone, Args)]
pub struct HashingArgs {
    /// Fingerprint algorithm (overrides config)
    #[arg(short, long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Read size for content hashing, e.g. 64KiB (overrides config)
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub chunk_size: Option<usize>,

    /// Accept empty files (overrides config)
    #[arg(long)]
    pub allow_empty: bool,
}

/// Arguments for `fingerprint`.
#[derive(Debug, Args)]
pub struct FingerprintArgs {
    /// Image files to fingerprint
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Pretty-print a JSON array instead of one record per line
    #[arg(long)]
    pub pretty: bool,

    /// Include the signature grid in debug logs
    #[arg(long)]
    pub show_grid: bool,

    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Arguments for `compare`.
#[derive(Debug, Args)]
pub struct CompareArgs {
    /// First image
    pub first: PathBuf,

    /// Second image
    pub second: PathBuf,

    /// Minimum similarity, as a fraction (0.9) or percentage (90%)
    #[arg(short, long, value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub hashing: HashingArgs,
}

/// Parse a similarity threshold such as `0.85` or `85%`.
///
/// # Errors
///
/// Returns an error message for non-numbers and values outside `[0, 1]`.
pub fn parse_threshold(s: &str) -> Result<f64, String> {
    let s = s.trim();
    let (num_str, scale) = match s.strip_suffix('%') {
        Some(rest) => (rest.trim(), 100.0),
        None => (s, 1.0),
    };

    let value: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid threshold: '{s}'"))?;
    let value = value / scale;

    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Threshold must be within [0, 1] (or 0%-100%), got '{s}'"));
    }
    Ok(value)
}

/// Parse a byte size such as `32768`, `32KiB` or `1MB`.
///
/// # Errors
///
/// Returns an error message for empty input, unknown suffixes and zero.
pub fn parse_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: usize = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: usize = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    let size = num
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Size too large: '{s}'"))?;
    if size == 0 {
        return Err("Size must be greater than zero".to_string());
    }
    Ok(size)
}
