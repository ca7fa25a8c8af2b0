//! Snapshot, temporary apply and restore of the npm network settings.
//!
//! The registry and dist-url are written by two independent npm calls, so the
//! pair is only ever consistent from the caller's point of view: restore always
//! re-applies both values even when only one of the mirror writes landed.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::npm::{ConfigKey, NpmError, PackageManager, is_unset};

pub const MIRROR_REGISTRY: &str = "https://registry.npm.taobao.org";
pub const MIRROR_DIST_URL: &str = "https://npm.taobao.org/dist";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfigPair {
    pub registry: String,
    pub dist_url: String,
}

impl ConfigPair {
    pub fn new(registry: impl Into<String>, dist_url: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            dist_url: dist_url.into(),
        }
    }

    pub fn mirror() -> Self {
        Self::new(MIRROR_REGISTRY, MIRROR_DIST_URL)
    }
}

/// Failure of a single key while reading or writing the pair.
#[derive(Debug, Error)]
#[error("npm config key `{key}`")]
pub struct KeyError {
    pub key: ConfigKey,
    #[source]
    pub source: NpmError,
}

#[derive(Clone)]
pub struct ConfigSwap {
    npm: Arc<dyn PackageManager>,
}

impl ConfigSwap {
    pub fn new(npm: Arc<dyn PackageManager>) -> Self {
        Self { npm }
    }

    /// Reads both values concurrently. The first failing read wins and no
    /// partial pair is returned.
    pub async fn snapshot(&self) -> Result<ConfigPair, KeyError> {
        let (registry, dist_url) =
            tokio::try_join!(self.read(ConfigKey::Registry), self.read(ConfigKey::DistUrl))?;
        debug!(registry = %registry, dist_url = %dist_url, "captured npm config");
        Ok(ConfigPair { registry, dist_url })
    }

    /// Writes both mirror values concurrently and waits for both to settle.
    ///
    /// Both writes are always awaited so that nothing is still in flight when
    /// the caller decides to restore.
    pub async fn apply_temporary(&self, mirror: &ConfigPair) -> Result<(), KeyError> {
        let (registry, dist_url) = tokio::join!(
            self.write(ConfigKey::Registry, &mirror.registry),
            self.write(ConfigKey::DistUrl, &mirror.dist_url),
        );
        registry?;
        dist_url?;
        info!(registry = %mirror.registry, dist_url = %mirror.dist_url, "mirror config applied");
        Ok(())
    }

    /// Re-applies the captured pair. Both keys are attempted even when one of
    /// them fails; the first failure is returned.
    ///
    /// The writes run one after the other. npm rewrites the whole user config
    /// file on every `config set`, so overlapping writes can drop one key.
    pub async fn restore(&self, original: &ConfigPair) -> Result<(), KeyError> {
        let registry = self.write(ConfigKey::Registry, &original.registry).await;
        let dist_url = self.write(ConfigKey::DistUrl, &original.dist_url).await;
        for err in [&registry, &dist_url]
            .into_iter()
            .filter_map(|result| result.as_ref().err())
        {
            warn!(key = %err.key, error = %err.source, "failed to restore npm config");
        }
        registry?;
        dist_url?;
        debug!("original npm config restored");
        Ok(())
    }

    async fn read(&self, key: ConfigKey) -> Result<String, KeyError> {
        self.npm
            .get(key)
            .await
            .map_err(|source| KeyError { key, source })
    }

    /// Empty or placeholder values delete the key instead of writing an empty
    /// string, which npm would persist as a literal value.
    async fn write(&self, key: ConfigKey, value: &str) -> Result<(), KeyError> {
        let result = if is_unset(value) {
            self.npm.delete(key).await
        } else {
            self.npm.set(key, value).await
        };
        result.map_err(|source| KeyError { key, source })
    }
}
