use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ConfigKey, NpmError, PackageManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCall {
    Get(ConfigKey),
    Set(ConfigKey, String),
    Delete(ConfigKey),
}

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<ConfigKey, String>,
    calls: Vec<ConfigCall>,
    failing_reads: HashSet<ConfigKey>,
    failing_writes: HashSet<ConfigKey>,
}

/// In-process npm config store that records every call made against it.
///
/// Unset keys read back as `undefined`, matching what the npm CLI prints.
#[derive(Debug, Clone, Default)]
pub struct MemoryNpmConfig {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryNpmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(registry: &str, dist_url: Option<&str>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock();
            inner
                .values
                .insert(ConfigKey::Registry, registry.to_string());
            if let Some(dist_url) = dist_url {
                inner
                    .values
                    .insert(ConfigKey::DistUrl, dist_url.to_string());
            }
        }
        store
    }

    pub fn fail_reads_of(&self, key: ConfigKey) {
        self.inner.lock().failing_reads.insert(key);
    }

    pub fn fail_writes_of(&self, key: ConfigKey) {
        self.inner.lock().failing_writes.insert(key);
    }

    pub fn value(&self, key: ConfigKey) -> Option<String> {
        self.inner.lock().values.get(&key).cloned()
    }

    pub fn calls(&self) -> Vec<ConfigCall> {
        self.inner.lock().calls.clone()
    }

    pub fn writes(&self) -> Vec<ConfigCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, ConfigCall::Get(_)))
            .collect()
    }
}

#[async_trait]
impl PackageManager for MemoryNpmConfig {
    async fn get(&self, key: ConfigKey) -> Result<String, NpmError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ConfigCall::Get(key));
        if inner.failing_reads.contains(&key) {
            return Err(NpmError::Injected {
                command: format!("config get {key}"),
            });
        }
        Ok(inner
            .values
            .get(&key)
            .cloned()
            .unwrap_or_else(|| "undefined".to_string()))
    }

    async fn set(&self, key: ConfigKey, value: &str) -> Result<(), NpmError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ConfigCall::Set(key, value.to_string()));
        if inner.failing_writes.contains(&key) {
            return Err(NpmError::Injected {
                command: format!("config set {key}"),
            });
        }
        inner.values.insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: ConfigKey) -> Result<(), NpmError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ConfigCall::Delete(key));
        inner.values.remove(&key);
        Ok(())
    }
}
