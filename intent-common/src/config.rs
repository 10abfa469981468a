//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting that can come from more than one place:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is never fatal: a warning is logged and compiled
//! defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name used under the platform config/data dirs
pub const APP_DIR_NAME: &str = "intent-batch";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "INTENT_BATCH_ROOT";

/// Environment variable carrying the classifier API key
pub const API_KEY_ENV: &str = "INTENT_BATCH_API_KEY";

/// Upload size ceiling: 5 MiB, inclusive
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Intent categories the classifier may assign
pub const DEFAULT_CANDIDATE_LABELS: [&str; 5] = [
    "Order Inquiry",
    "Complaint",
    "Refund Request",
    "General Inquiry",
    "Technical Support",
];

const DEFAULT_PREDICT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_ZERO_SHOT_MODEL_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding persisted client state
    pub root_folder: Option<PathBuf>,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Remote classifier settings
    pub classifier: ClassifierConfig,
    /// Upload validation settings
    pub upload: UploadConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Which remote classification service the client talks to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Dedicated backend exposing `/predict` and `/predict-csv`
    #[default]
    PredictApi,
    /// Hosted zero-shot classification model with candidate labels
    ZeroShot,
}

/// Remote classifier configuration
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: BackendKind,
    /// Base URL of the predict API (`/predict`, `/predict-csv` are appended)
    pub base_url: String,
    /// Full URL of the zero-shot model endpoint
    pub model_url: String,
    /// Bearer token for the zero-shot endpoint
    pub api_key: Option<String>,
    pub candidate_labels: Vec<String>,
    /// Per-call timeout
    pub timeout_secs: u64,
    /// Timeout for one bulk upload call
    pub bulk_timeout_secs: u64,
    /// Maximum in-flight classification calls
    pub concurrency: usize,
    /// Total attempts per call, including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub backoff_ms: u64,
    /// Optional client-side request rate ceiling
    pub requests_per_second: Option<u32>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            base_url: DEFAULT_PREDICT_BASE_URL.to_string(),
            model_url: DEFAULT_ZERO_SHOT_MODEL_URL.to_string(),
            api_key: None,
            candidate_labels: DEFAULT_CANDIDATE_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            timeout_secs: 30,
            bulk_timeout_secs: 120,
            concurrency: 5,
            max_attempts: 2,
            backoff_ms: 500,
            requests_per_second: None,
        }
    }
}

// Keeps the API key out of logs
impl fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("backend", &self.backend)
            .field("base_url", &self.base_url)
            .field("model_url", &self.model_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("candidate_labels", &self.candidate_labels)
            .field("timeout_secs", &self.timeout_secs)
            .field("bulk_timeout_secs", &self.bulk_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("backoff_ms", &self.backoff_ms)
            .field("requests_per_second", &self.requests_per_second)
            .finish()
    }
}

/// Upload validation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted file size in bytes (inclusive)
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Default config file location: `<config_dir>/intent-batch/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No file at this path; compiled defaults
    Missing(PathBuf),
    /// No platform config directory; compiled defaults
    NoConfigDir,
}

impl ConfigSource {
    /// Report the source; call once logging is initialized
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Missing(path) => warn!(
                "Config file not found at {}, using compiled defaults",
                path.display()
            ),
            ConfigSource::NoConfigDir => {
                warn!("Could not determine config directory, using compiled defaults")
            }
        }
    }
}

/// Load config from `path` (or the default location) without logging
///
/// For callers that configure logging from the result; report the returned
/// [`ConfigSource`] afterwards. A file that exists but does not parse is an
/// error.
pub fn load_config(path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok((TomlConfig::default(), ConfigSource::NoConfigDir)),
        },
    };

    if !path.exists() {
        return Ok((TomlConfig::default(), ConfigSource::Missing(path)));
    }

    let config = load_toml_config(&path)?;
    Ok((config, ConfigSource::File(path)))
}

/// Load config from `path` (or the default location), falling back to defaults
///
/// A missing file logs a warning and yields defaults. A file that exists but
/// does not parse is an error.
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    let (config, source) = load_config(path)?;
    source.log();
    Ok(config)
}

/// Write TOML config atomically (temp file + rename)
///
/// On Unix the file is restricted to 0600 since it may hold an API key.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(Error::Io(e));
    }

    Ok(())
}

/// Resolves the root folder from CLI, environment, TOML and compiled default
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    toml_config: &'a TomlConfig,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, toml_config: &'a TomlConfig) -> Self {
        Self {
            cli_arg,
            toml_config,
        }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_config.root_folder {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./intent_batch_data"))
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created root folder: {}", path.display());
    }
    Ok(())
}

/// Resolve the classifier API key
///
/// **Priority:** ENV → TOML
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .classifier
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "API key found in both environment and TOML config. Using environment (highest priority)."
        );
    }

    if let Some(key) = env_key {
        info!("API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("API key loaded from TOML config");
        return Some(key);
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
