//! imgdupe - Perceptual image fingerprints and near-duplicate detection
//!
//! Each image is summarized by an [`ImageRecord`]: a BLAKE3 hash of its raw
//! bytes plus a small perceptual bit grid (difference hash by default).
//! [`compare`] treats byte-identical files as duplicates and otherwise
//! scores the fraction of agreeing bits against a caller-chosen threshold.
//!
//! The library does no directory walking, storage, or reporting; the
//! `imgdupe` binary is a thin front end over [`run_app`].

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod record;
pub mod scanner;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use rayon::prelude::*;
use serde::Serialize;

pub use error::{Error, ExitCode, Result};
pub use record::{compare, similarity, ImageRecord};
pub use scanner::{
    ContentHash, Fingerprint, FingerprintAlgorithm, FingerprintConfig, Fingerprinter, Hasher,
    Signature,
};

use cli::{Cli, Commands, CompareArgs, FingerprintArgs, HashingArgs};
use config::Config;
use progress::Progress;

/// Run the application logic for parsed CLI arguments.
///
/// # Errors
///
/// Returns an error if configuration loading fails or no record could be
/// built.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    log::debug!("Effective configuration: {:?}", config);

    match cli.command {
        Commands::Fingerprint(args) => run_fingerprint(args, config, cli.quiet),
        Commands::Compare(args) => run_compare(args, config),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
    }
}

/// Layer command-line overrides on top of the loaded configuration.
fn apply_overrides(mut config: Config, hashing: &HashingArgs) -> Config {
    if let Some(algorithm) = hashing.algorithm {
        config.algorithm = algorithm.into();
    }
    if let Some(chunk_size) = hashing.chunk_size {
        config.chunk_size = chunk_size;
    }
    if hashing.allow_empty {
        config.allow_empty = true;
    }
    config
}

fn run_fingerprint(args: FingerprintArgs, config: Config, quiet: bool) -> anyhow::Result<ExitCode> {
    let config = apply_overrides(config, &args.hashing);
    let hasher = config.hasher();
    let fingerprinter = Fingerprinter::new(config.fingerprint_config())?;

    let progress = Progress::new(args.files.len(), quiet);
    let results: Vec<(PathBuf, Result<ImageRecord>)> = args
        .files
        .par_iter()
        .map(|path| {
            let result = ImageRecord::from_path(path, &hasher, &fingerprinter);
            progress.inc(&path.display().to_string());
            (path.clone(), result)
        })
        .collect();
    progress.finish();

    let mut records = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (path, result) in results {
        match result {
            Ok(record) => {
                if args.show_grid {
                    log::debug!(
                        "{} signature:\n{}",
                        record.identifier(),
                        record.signature().to_grid_string()
                    );
                }
                records.push(record);
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    if records.is_empty() {
        bail!("None of the {} file(s) could be fingerprinted", failed);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.pretty {
        serde_json::to_writer_pretty(&mut out, &records)?;
        writeln!(out)?;
    } else {
        for record in &records {
            serde_json::to_writer(&mut out, record)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    log::info!("Fingerprinted {} file(s), {} failed", records.len(), failed);
    Ok(if failed > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

#[derive(Debug, Serialize)]
struct ComparisonReport<'a> {
    first: &'a str,
    second: &'a str,
    identical_content: bool,
    similarity: f64,
    threshold: f64,
    duplicate: bool,
}

fn run_compare(args: CompareArgs, config: Config) -> anyhow::Result<ExitCode> {
    let config = apply_overrides(config, &args.hashing);
    let threshold = args.threshold.unwrap_or(config.threshold);
    let hasher = config.hasher();
    let fingerprinter = Fingerprinter::new(config.fingerprint_config())?;

    let first = ImageRecord::from_path(&args.first, &hasher, &fingerprinter)
        .with_context(|| format!("Failed to fingerprint {}", args.first.display()))?;
    let second = ImageRecord::from_path(&args.second, &hasher, &fingerprinter)
        .with_context(|| format!("Failed to fingerprint {}", args.second.display()))?;

    let duplicate = compare(&first, &second, threshold)?;
    let report = ComparisonReport {
        first: first.identifier(),
        second: second.identifier(),
        identical_content: first.content_hash() == second.content_hash(),
        similarity: similarity(&first, &second)?,
        threshold,
        duplicate,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} <-> {}: similarity {:.3} (threshold {:.3}){} -> {}",
            first.short_name(),
            second.short_name(),
            report.similarity,
            threshold,
            if report.identical_content {
                ", identical content"
            } else {
                ""
            },
            if duplicate { "duplicate" } else { "distinct" }
        );
    }

    Ok(if duplicate {
        ExitCode::Success
    } else {
        ExitCode::NotDuplicate
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::AlgorithmArg;

    #[test]
    fn test_apply_overrides() {
        let hashing = HashingArgs {
            algorithm: Some(AlgorithmArg::Mean),
            chunk_size: Some(1024),
            allow_empty: true,
        };
        let config = apply_overrides(Config::default(), &hashing);
        assert_eq!(config.algorithm, FingerprintAlgorithm::Mean);
        assert_eq!(config.chunk_size, 1024);
        assert!(config.allow_empty);
    }

    #[test]
    fn test_apply_overrides_keeps_config_when_unset() {
        let hashing = HashingArgs {
            algorithm: None,
            chunk_size: None,
            allow_empty: false,
        };
        let base = Config {
            allow_empty: true,
            ..Config::default()
        };
        assert_eq!(apply_overrides(base.clone(), &hashing), base);
    }
}
