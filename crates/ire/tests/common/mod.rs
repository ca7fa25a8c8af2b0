#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use ire::{
    init_step::{InitError, Initializer},
    npm::{ConfigKey, MemoryNpmConfig, NpmError, PackageManager},
    orchestrator::{Interrupt, Orchestrator},
};
use parking_lot::Mutex;
use tokio::sync::Notify;

pub const ORIGINAL_REGISTRY: &str = "https://registry.npmjs.org";
pub const ORIGINAL_DIST_URL: &str = "https://nodejs.org/dist";

pub fn original_store() -> MemoryNpmConfig {
    MemoryNpmConfig::with_values(ORIGINAL_REGISTRY, Some(ORIGINAL_DIST_URL))
}

pub fn orchestrator(
    store: &MemoryNpmConfig,
    initializer: Arc<dyn Initializer>,
    interrupt: Interrupt,
) -> Orchestrator {
    Orchestrator::new(Arc::new(store.clone()), initializer, interrupt)
}

#[derive(Debug, Clone)]
pub struct InitRun {
    pub workdir: PathBuf,
    pub folder_name: String,
    pub workdir_existed: bool,
    pub registry: Option<String>,
    pub dist_url: Option<String>,
}

/// Records what the world looked like when the init step ran.
pub struct RecordingInitializer {
    npm: MemoryNpmConfig,
    exit_code: Option<i32>,
    break_registry_writes: bool,
    runs: Mutex<Vec<InitRun>>,
}

impl RecordingInitializer {
    pub fn succeeding(npm: &MemoryNpmConfig) -> Arc<Self> {
        Arc::new(Self::build(npm, None, false))
    }

    pub fn failing(npm: &MemoryNpmConfig, exit_code: i32) -> Arc<Self> {
        Arc::new(Self::build(npm, Some(exit_code), false))
    }

    /// Succeeds, but makes every later registry write fail.
    pub fn breaking_restore(npm: &MemoryNpmConfig) -> Arc<Self> {
        Arc::new(Self::build(npm, None, true))
    }

    fn build(npm: &MemoryNpmConfig, exit_code: Option<i32>, break_registry_writes: bool) -> Self {
        Self {
            npm: npm.clone(),
            exit_code,
            break_registry_writes,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<InitRun> {
        self.runs.lock().clone()
    }
}

#[async_trait]
impl Initializer for RecordingInitializer {
    async fn initialize(&self, workdir: &Path, folder_name: &str) -> Result<(), InitError> {
        self.runs.lock().push(InitRun {
            workdir: workdir.to_path_buf(),
            folder_name: folder_name.to_string(),
            workdir_existed: workdir.is_dir(),
            registry: self.npm.value(ConfigKey::Registry),
            dist_url: self.npm.value(ConfigKey::DistUrl),
        });
        if self.break_registry_writes {
            self.npm.fail_writes_of(ConfigKey::Registry);
        }
        match self.exit_code {
            Some(code) => Err(InitError::Exit {
                program: "recording-init".to_string(),
                code: Some(code),
            }),
            None => Ok(()),
        }
    }
}

/// Never finishes. Flags when its future is dropped.
#[derive(Default)]
pub struct HangingInitializer {
    pub started: Arc<Notify>,
    pub dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Initializer for HangingInitializer {
    async fn initialize(&self, _workdir: &Path, _folder_name: &str) -> Result<(), InitError> {
        let _flag = DropFlag(Arc::clone(&self.dropped));
        self.started.notify_one();
        std::future::pending::<Result<(), InitError>>().await
    }
}

/// In-memory npm whose `set` calls park while the gate is held.
#[derive(Clone)]
pub struct GatedNpm {
    pub store: MemoryNpmConfig,
    gate: Arc<Gate>,
}

#[derive(Default)]
struct Gate {
    held: AtomicBool,
    parked: Notify,
    release: Notify,
}

impl GatedNpm {
    pub fn new(store: MemoryNpmConfig) -> Self {
        Self {
            store,
            gate: Arc::new(Gate::default()),
        }
    }

    pub fn hold(&self) {
        self.gate.held.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.gate.held.store(false, Ordering::SeqCst);
        self.gate.release.notify_waiters();
    }

    /// Resolves once a `set` is parked behind the gate.
    pub async fn parked(&self) {
        self.gate.parked.notified().await;
    }

    async fn pass_gate(&self) {
        if !self.gate.held.load(Ordering::SeqCst) {
            return;
        }
        let released = self.gate.release.notified();
        tokio::pin!(released);
        released.as_mut().enable();
        self.gate.parked.notify_one();
        if self.gate.held.load(Ordering::SeqCst) {
            released.await;
        }
    }
}

#[async_trait]
impl PackageManager for GatedNpm {
    async fn get(&self, key: ConfigKey) -> Result<String, NpmError> {
        self.store.get(key).await
    }

    async fn set(&self, key: ConfigKey, value: &str) -> Result<(), NpmError> {
        self.pass_gate().await;
        self.store.set(key, value).await
    }

    async fn delete(&self, key: ConfigKey) -> Result<(), NpmError> {
        self.store.delete(key).await
    }
}

/// Succeeds after holding the gate, so the restore that follows hangs.
pub struct GateHoldingInitializer {
    pub npm: GatedNpm,
}

#[async_trait]
impl Initializer for GateHoldingInitializer {
    async fn initialize(&self, _workdir: &Path, _folder_name: &str) -> Result<(), InitError> {
        self.npm.hold();
        Ok(())
    }
}
