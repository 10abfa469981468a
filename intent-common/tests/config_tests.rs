//! Integration tests for configuration resolution and graceful degradation
//!
//! Tests that manipulate INTENT_BATCH_ROOT or INTENT_BATCH_API_KEY are marked
//! with #[serial] so they never race on the process environment.

use intent_common::config::{
    load_config, load_or_default, resolve_api_key, write_toml_config, BackendKind,
    ClassifierConfig, ConfigSource, LoggingConfig, RootFolderResolver, TomlConfig, UploadConfig,
    API_KEY_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn sample_config() -> TomlConfig {
    TomlConfig {
        root_folder: Some(PathBuf::from("/srv/intent")),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        classifier: ClassifierConfig {
            backend: BackendKind::ZeroShot,
            api_key: Some("toml-key".to_string()),
            concurrency: 7,
            ..Default::default()
        },
        upload: UploadConfig::default(),
    }
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = load_or_default(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_load_config_reports_source() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let (config, source) = load_config(Some(&missing)).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::Missing(missing));

    let path = dir.path().join("config.toml");
    write_toml_config(&sample_config(), &path).unwrap();
    let (config, source) = load_config(Some(&path)).unwrap();
    assert_eq!(config, sample_config());
    assert_eq!(source, ConfigSource::File(path));
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[classifier\nbackend = ").unwrap();

    assert!(load_or_default(Some(&path)).is_err());
}

#[test]
fn test_write_then_load_preserves_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = sample_config();
    write_toml_config(&config, &path).unwrap();

    let loaded = load_or_default(Some(&path)).unwrap();
    assert_eq!(loaded, config);
    assert!(!path.with_extension("toml.tmp").exists());
}

#[cfg(unix)]
#[test]
fn test_written_config_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    write_toml_config(&sample_config(), &path).unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
#[serial]
fn test_root_folder_cli_beats_env_and_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = sample_config();

    let resolved = RootFolderResolver::new(Some(Path::new("/from/cli")), &config).resolve();
    assert_eq!(resolved, PathBuf::from("/from/cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_root_folder_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let config = sample_config();

    let resolved = RootFolderResolver::new(None, &config).resolve();
    assert_eq!(resolved, PathBuf::from("/from/env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_root_folder_toml_then_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let config = sample_config();
    let resolved = RootFolderResolver::new(None, &config).resolve();
    assert_eq!(resolved, PathBuf::from("/srv/intent"));

    let defaults = TomlConfig::default();
    let resolved = RootFolderResolver::new(None, &defaults).resolve();
    assert!(resolved.to_string_lossy().contains("intent-batch")
        || resolved.to_string_lossy().contains("intent_batch_data"));
}

#[test]
#[serial]
fn test_api_key_env_beats_toml() {
    env::set_var(API_KEY_ENV, "env-key");
    assert_eq!(resolve_api_key(&sample_config()), Some("env-key".to_string()));
    env::remove_var(API_KEY_ENV);
}

#[test]
#[serial]
fn test_api_key_whitespace_is_ignored() {
    env::set_var(API_KEY_ENV, "   ");
    assert_eq!(resolve_api_key(&sample_config()), Some("toml-key".to_string()));

    let mut config = sample_config();
    config.classifier.api_key = Some(String::new());
    assert_eq!(resolve_api_key(&config), None);
    env::remove_var(API_KEY_ENV);
}
