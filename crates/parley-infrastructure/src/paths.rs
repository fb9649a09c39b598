//! Unified path management for parley files.
//!
//! ```text
//! ~/.config/parley/          # Config directory (platform equivalent elsewhere)
//! ├── config.toml            # Client configuration
//! └── preferences.toml       # Persisted UI preferences
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// No per-user configuration directory on this platform.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find configuration directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for parley_core::ParleyError {
    fn from(e: PathError) -> Self {
        parley_core::ParleyError::config(e.to_string())
    }
}

pub struct ParleyPaths;

impl ParleyPaths {
    const APP_NAME: &'static str = "parley";

    /// Returns the parley configuration directory (e.g. `~/.config/parley/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(Self::APP_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn preferences_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("preferences.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_live_under_config_dir() {
        // Headless CI may lack a config dir; only check layout when present.
        if let Ok(dir) = ParleyPaths::config_dir() {
            assert!(dir.ends_with("parley"));
            assert_eq!(ParleyPaths::config_file().unwrap(), dir.join("config.toml"));
            assert_eq!(
                ParleyPaths::preferences_file().unwrap(),
                dir.join("preferences.toml")
            );
        }
    }
}
