//! Configuration service implementation.
//!
//! Loads [`ClientConfig`] from `<config_dir>/parley/config.toml`, falls back
//! to defaults when the file is missing, then applies `PARLEY_*` environment
//! overrides. Command-line flags are applied by the binary on top.

use std::path::PathBuf;

use parley_core::{ClientConfig, DeliveryMode, ParleyError, Result};

use crate::paths::ParleyPaths;
use crate::storage::AtomicTomlFile;

pub const ENV_BASE_URL: &str = "PARLEY_BASE_URL";
pub const ENV_DELIVERY_MODE: &str = "PARLEY_DELIVERY_MODE";
pub const ENV_PAGE_SIZE: &str = "PARLEY_PAGE_SIZE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "PARLEY_REQUEST_TIMEOUT_SECS";
pub const ENV_DIAGNOSTICS: &str = "PARLEY_DIAGNOSTICS";

#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
}

impl ConfigService {
    /// Service reading the default config file location.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ParleyPaths::config_file()?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads the file (or defaults) and applies process environment overrides.
    pub fn load(&self) -> Result<ClientConfig> {
        let mut config = self.load_file()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads the file only. A missing file yields defaults; a malformed one
    /// is an error.
    pub fn load_file(&self) -> Result<ClientConfig> {
        let file: AtomicTomlFile<ClientConfig> = AtomicTomlFile::new(self.path.clone());
        match file.load()? {
            Some(config) => {
                tracing::debug!("[Config] Loaded {}", self.path.display());
                Ok(config)
            }
            None => {
                tracing::debug!(
                    "[Config] No config at {}, using defaults",
                    self.path.display()
                );
                Ok(ClientConfig::default())
            }
        }
    }
}

/// Applies `PARLEY_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
        config.base_url = url.trim().to_string();
    }
    if let Some(mode) = lookup(ENV_DELIVERY_MODE) {
        config.delivery_mode = mode
            .parse::<DeliveryMode>()
            .map_err(|e| ParleyError::config(format!("{ENV_DELIVERY_MODE}: {e}")))?;
    }
    if let Some(size) = lookup(ENV_PAGE_SIZE) {
        config.page_size = parse_number(ENV_PAGE_SIZE, &size)?;
    }
    if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
        config.request_timeout_secs = parse_number(ENV_REQUEST_TIMEOUT_SECS, &secs)?;
    }
    if let Some(flag) = lookup(ENV_DIAGNOSTICS) {
        config.diagnostics.enabled = parse_flag(ENV_DIAGNOSTICS, &flag)?;
    }
    Ok(())
}

fn parse_number<N: std::str::FromStr>(key: &str, raw: &str) -> Result<N> {
    raw.trim()
        .parse()
        .map_err(|_| ParleyError::config(format!("{key}: expected a number, got '{raw}'")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ParleyError::config(format!(
            "{key}: expected a boolean, got '{raw}'"
        ))),
    }
}
