//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. a TOML file (the platform config dir, or `--config <FILE>`)
//! 3. `IMGDUPE_*` environment variables (e.g. `IMGDUPE_THRESHOLD=0.85`)
//! 4. CLI flags, applied by the caller after loading

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::{FingerprintAlgorithm, FingerprintConfig, Hasher, ResampleFilter, HASH_CHUNK_SIZE};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "IMGDUPE_";

/// Default similarity threshold for `compare`.
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fingerprint algorithm.
    pub algorithm: FingerprintAlgorithm,
    /// Resampling filter.
    pub filter: ResampleFilter,
    /// Minimum similarity for two images to count as duplicates.
    pub threshold: f64,
    /// Read size for content hashing, in bytes.
    pub chunk_size: usize,
    /// Hash empty files instead of rejecting them.
    pub allow_empty: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: FingerprintAlgorithm::default(),
            filter: ResampleFilter::default(),
            threshold: DEFAULT_THRESHOLD,
            chunk_size: HASH_CHUNK_SIZE,
            allow_empty: false,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// When `path` is `None` the platform config file is used if it exists.
    /// An explicit `path` must exist.
    ///
    /// # Errors
    ///
    /// Fails if the explicit file is missing, a layer cannot be parsed, or
    /// the merged values do not pass [`Config::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path().ok(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            log::debug!("Reading config file {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Fails for thresholds outside `[0, 1]` and a zero chunk size.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            );
        }
        if self.chunk_size == 0 {
            bail!("chunk_size must be greater than zero");
        }
        Ok(())
    }

    /// Fingerprint configuration on the algorithm's default grid.
    #[must_use]
    pub fn fingerprint_config(&self) -> FingerprintConfig {
        FingerprintConfig::new(self.algorithm).with_filter(self.filter)
    }

    /// Content hasher for these settings.
    #[must_use]
    pub fn hasher(&self) -> Hasher {
        Hasher::with_chunk_size(self.chunk_size).allow_empty(self.allow_empty)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Get the default platform-specific configuration path.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "imgdupe", "imgdupe")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }
}
