//! Integration tests for layered configuration.
//!
//! These tests cover defaults, TOML files, `IMGDUPE_*` environment
//! overrides, and validation.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use imgdupe::config::{Config, ENV_PREFIX};
use imgdupe::scanner::{FingerprintAlgorithm, ResampleFilter};
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all IMGDUPE_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with(ENV_PREFIX) {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_load_from_toml_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
algorithm = "mean"
filter = "triangle"
threshold = 0.8
chunk_size = 4096
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.algorithm, FingerprintAlgorithm::Mean);
    assert_eq!(config.filter, ResampleFilter::Triangle);
    assert_eq!(config.threshold, 0.8);
    assert_eq!(config.chunk_size, 4096);
    assert!(!config.allow_empty);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "threshold = 0.8\n").unwrap();

    std::env::set_var("IMGDUPE_THRESHOLD", "0.95");
    std::env::set_var("IMGDUPE_ALLOW_EMPTY", "true");
    let config = Config::load(Some(&path));
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.threshold, 0.95);
    assert!(config.allow_empty);
}

#[test]
fn test_invalid_threshold_in_file_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "threshold = 1.5\n").unwrap();

    assert!(Config::load(Some(&path)).is_err());
}

#[test]
fn test_unknown_algorithm_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "algorithm = \"wavelet\"\n").unwrap();

    assert!(Config::load(Some(&path)).is_err());
}

#[test]
fn test_defaults_only_figment() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_saved_toml_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let config = Config {
        algorithm: FingerprintAlgorithm::Mean,
        threshold: 0.75,
        ..Config::default()
    };
    fs::write(&path, config.to_toml().unwrap()).unwrap();

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(&path));
    let loaded: Config = figment.extract().unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_env_provider_maps_keys() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    std::env::set_var("IMGDUPE_ALGORITHM", "mean");
    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX));
    let config: Result<Config, _> = figment.extract();
    clear_env();

    assert_eq!(config.unwrap().algorithm, FingerprintAlgorithm::Mean);
}
