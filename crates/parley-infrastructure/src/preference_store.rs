//! TOML-backed preference repository.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parley_core::Result;
use parley_core::ports::PreferenceRepository;
use tokio::sync::Mutex;

use crate::paths::ParleyPaths;
use crate::storage::AtomicTomlFile;

type PreferenceTable = BTreeMap<String, toml::Value>;

/// Persists preferences as a flat TOML table.
///
/// Reads never fail: a missing or unreadable file means "unset".
pub struct TomlPreferenceStore {
    file: AtomicTomlFile<PreferenceTable>,
    write_lock: Mutex<()>,
}

impl TomlPreferenceStore {
    /// Store at the default location (`<config_dir>/parley/preferences.toml`).
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ParleyPaths::preferences_file()?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
            write_lock: Mutex::new(()),
        }
    }

    fn load_table(&self) -> PreferenceTable {
        match self.file.load() {
            Ok(table) => table.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    "[Preferences] Ignoring unreadable {}: {}",
                    self.file.path().display(),
                    e
                );
                PreferenceTable::new()
            }
        }
    }
}

#[async_trait]
impl PreferenceRepository for TomlPreferenceStore {
    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.load_table().get(key).and_then(toml::Value::as_bool))
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.load_table();
        table.insert(key.to_string(), toml::Value::Boolean(value));
        self.file.save(&table)?;
        tracing::debug!("[Preferences] {} = {}", key, value);
        Ok(())
    }
}
