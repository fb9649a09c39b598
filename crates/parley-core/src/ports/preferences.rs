//! Local preference port.

use async_trait::async_trait;

use crate::error::Result;

/// Key under which the verbose display preference is stored.
pub const VERBOSE_MODE_KEY: &str = "verbose_mode";

/// Client-local persistent key/value settings.
#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    /// Returns the stored value, or `None` if the key was never set.
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}
