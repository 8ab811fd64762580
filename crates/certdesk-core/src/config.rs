//! Configuration resolution for certdesk.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/certdesk/settings.json)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete certdesk configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub certificates: CertificatesConfig,
}

/// Daemon-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub database_path: Option<PathBuf>,
    /// Where issued certificate material is written.
    pub certificates_dir: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            certificates_dir: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Action queue sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Number of worker tasks executing queued jobs.
    pub workers: usize,
    /// Maximum number of jobs waiting for a worker.
    pub queue_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 256,
        }
    }
}

/// Certificate dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificatesConfig {
    /// Certificate types the daemon requests automatically.
    pub automatable_types: Vec<String>,
}

impl Default for CertificatesConfig {
    fn default() -> Self {
        Self {
            automatable_types: vec!["http".to_string(), "dns".to_string()],
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit_path` must exist when given; the global file is optional.
pub fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
    let global_path = global_config_path().filter(|p| p.exists());
    let layers = global_path.iter().map(PathBuf::as_path).chain(explicit_path);
    let mut config = load_layers(layers)?;

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Merge config files in order and fill whatever none of them set with
/// defaults. Later files only override the keys they contain.
fn load_layers<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Result<Config> {
    let mut merged = serde_json::Value::Object(serde_json::Map::new());
    for path in paths {
        merge_values(&mut merged, load_config_file(path)?);
    }
    serde_json::from_value(merged).map_err(|e| Error::Config(format!("Invalid config: {e}")))
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Get the default database path for the daemon.
pub fn database_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("certdesk.db"))
}

/// Get the default directory for issued certificate material.
pub fn certificates_dir() -> Option<PathBuf> {
    config_dir().map(|p| p.join("certificates"))
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .map(|p| p.join("certdesk"))
}

fn load_config_file(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !value.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must contain a JSON object",
            path.display()
        )));
    }
    Ok(value)
}

/// Recursively merge `overlay` into `base`. Objects merge key by key; any
/// other value replaces what was there.
fn merge_values(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("CERTDESK_DB_PATH") {
        config.daemon.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("CERTDESK_CERTIFICATES_DIR") {
        config.daemon.certificates_dir = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("CERTDESK_LOG_LEVEL") {
        config.daemon.log_level = val;
    }
    if let Some(n) = lookup("CERTDESK_JOB_WORKERS").and_then(|v| v.parse().ok()) {
        config.jobs.workers = n;
    }
    if let Some(n) = lookup("CERTDESK_JOB_QUEUE_CAPACITY").and_then(|v| v.parse().ok()) {
        config.jobs.queue_capacity = n;
    }
    if let Some(val) = lookup("CERTDESK_AUTOMATABLE_TYPES") {
        config.certificates.automatable_types = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
}
