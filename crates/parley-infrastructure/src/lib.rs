pub mod config_service;
pub mod paths;
pub mod preference_store;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::paths::ParleyPaths;
pub use crate::preference_store::TomlPreferenceStore;
