mod interrupt;

use std::{path::Path, sync::Arc, time::Duration};

use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::ScaffoldError,
    init_step::{Initializer, ScriptInitializer},
    npm::{NpmCli, PackageManager},
    state::InvocationState,
    swap::{ConfigPair, ConfigSwap},
    target::{self, Rejection, TargetSpec},
};

pub use interrupt::{Interrupt, spawn_signal_listener};

pub const DEFAULT_RESTORE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Validating,
    SnapshottingConfig,
    ApplyingTempConfig,
    RunningInitStep,
    RestoringConfig,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Validating => "validating",
            Phase::SnapshottingConfig => "snapshotting_config",
            Phase::ApplyingTempConfig => "applying_temp_config",
            Phase::RunningInitStep => "running_init_step",
            Phase::RestoringConfig => "restoring_config",
            Phase::Done => "done",
        }
    }
}

#[derive(Debug, Default)]
struct PhaseLog {
    history: Vec<Phase>,
}

impl PhaseLog {
    fn current(&self) -> Phase {
        self.history.last().copied().unwrap_or(Phase::Idle)
    }

    fn enter(&mut self, next: Phase) {
        debug!(from = self.current().as_str(), to = next.as_str(), "phase transition");
        self.history.push(next);
    }
}

#[derive(Debug, Clone)]
pub struct ScaffoldReport {
    pub run_id: Uuid,
    pub target: TargetSpec,
    pub original: ConfigPair,
    pub phases: Vec<Phase>,
}

pub struct Orchestrator {
    swap: ConfigSwap,
    initializer: Arc<dyn Initializer>,
    mirror: ConfigPair,
    init_timeout: Option<Duration>,
    restore_timeout: Duration,
    interrupt: Interrupt,
}

impl Orchestrator {
    pub fn new(
        npm: Arc<dyn PackageManager>,
        initializer: Arc<dyn Initializer>,
        interrupt: Interrupt,
    ) -> Self {
        Self {
            swap: ConfigSwap::new(npm),
            initializer,
            mirror: ConfigPair::mirror(),
            init_timeout: None,
            restore_timeout: DEFAULT_RESTORE_TIMEOUT,
            interrupt,
        }
    }

    pub fn from_app_config(config: &AppConfig, interrupt: Interrupt) -> Self {
        let npm = NpmCli::new(config.npm.program.clone(), config.npm.args.clone());
        let initializer = ScriptInitializer::new(config.init.program.clone(), config.init.args.clone());
        Self::new(Arc::new(npm), Arc::new(initializer), interrupt)
            .with_mirror(config.mirror.clone())
            .with_init_timeout(config.init.timeout())
    }

    pub fn with_mirror(mut self, mirror: ConfigPair) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_restore_timeout(mut self, timeout: Duration) -> Self {
        self.restore_timeout = timeout;
        self
    }

    pub async fn run(&self, folder_name: &str, cwd: &Path) -> Result<ScaffoldReport, ScaffoldError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("scaffold", %run_id, folder = folder_name);
        self.run_inner(run_id, folder_name, cwd).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        folder_name: &str,
        cwd: &Path,
    ) -> Result<ScaffoldReport, ScaffoldError> {
        let mut phases = PhaseLog::default();

        phases.enter(Phase::Validating);
        let target = match target::validate(folder_name, cwd) {
            Ok(target) => target,
            Err((spec, Rejection::AlreadyExists)) => {
                phases.enter(Phase::Done);
                return Err(ScaffoldError::TargetConflict {
                    name: spec.requested_name,
                    path: spec.absolute_path,
                });
            }
        };

        phases.enter(Phase::SnapshottingConfig);
        let original = tokio::select! {
            biased;
            _ = self.interrupt.wait() => {
                info!("interrupted before npm config was touched");
                return Err(ScaffoldError::Interrupted {
                    config_touched: false,
                });
            }
            snapshot = self.swap.snapshot() => snapshot.map_err(ScaffoldError::ConfigRead)?,
        };
        info!(
            registry = %original.registry,
            dist_url = %original.dist_url,
            "original npm config captured"
        );

        let state = InvocationState::new(original, target);
        let outcome = self.scaffold(&state, &mut phases).await;

        phases.enter(Phase::RestoringConfig);
        let restored = self.restore(&state).await;
        phases.enter(Phase::Done);

        match (outcome, restored) {
            (Ok(()), Ok(())) => {
                info!(path = ?state.target().absolute_path, "project initialized");
                Ok(ScaffoldReport {
                    run_id,
                    target: state.target().clone(),
                    original: state.original().clone(),
                    phases: phases.history,
                })
            }
            (Err(err), Ok(())) => {
                warn!(error = ?err, "scaffold failed, npm config restored");
                Err(err)
            }
            (outcome, Err(restore_err)) => {
                if let Err(err) = outcome {
                    error!(error = ?err, "scaffold failed before npm config restore");
                }
                Err(restore_err)
            }
        }
    }

    /// Bounded so a hung `npm config` call cannot keep the process alive after
    /// the signal handler has taken over SIGINT.
    async fn restore(&self, state: &InvocationState) -> Result<(), ScaffoldError> {
        match tokio::time::timeout(self.restore_timeout, state.restore_once(&self.swap)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(source)) => Err(ScaffoldError::Restore {
                original: state.original().clone(),
                source,
            }),
            Err(_) => {
                error!(
                    timeout_secs = self.restore_timeout.as_secs_f64(),
                    "npm config restore did not finish in time"
                );
                Err(ScaffoldError::RestoreTimedOut {
                    original: state.original().clone(),
                    timeout: self.restore_timeout,
                })
            }
        }
    }

    /// Everything between the snapshot and the restore. Any error returned
    /// here still goes through restoration.
    async fn scaffold(
        &self,
        state: &InvocationState,
        phases: &mut PhaseLog,
    ) -> Result<(), ScaffoldError> {
        phases.enter(Phase::ApplyingTempConfig);
        let prepare = self.prepare(state.target());
        tokio::pin!(prepare);
        let prepared = tokio::select! {
            biased;
            _ = self.interrupt.wait() => {
                warn!("interrupted while applying mirror config, waiting for in-flight writes");
                if let Err(err) = prepare.await {
                    debug!(error = ?err, "prepare step failed after interrupt");
                }
                return Err(ScaffoldError::Interrupted {
                    config_touched: true,
                });
            }
            result = &mut prepare => result,
        };
        prepared?;

        phases.enter(Phase::RunningInitStep);
        tokio::select! {
            biased;
            _ = self.interrupt.wait() => {
                warn!("interrupted while init step was running");
                Err(ScaffoldError::Interrupted {
                    config_touched: true,
                })
            }
            result = self.run_init(state.target()) => result,
        }
    }

    /// Mirror writes and folder creation run side by side. All three are
    /// awaited before any failure is reported.
    async fn prepare(&self, target: &TargetSpec) -> Result<(), ScaffoldError> {
        let (applied, created) = tokio::join!(
            self.swap.apply_temporary(&self.mirror),
            tokio::fs::create_dir(&target.absolute_path),
        );
        applied.map_err(ScaffoldError::ConfigWrite)?;
        created.map_err(|source| ScaffoldError::CreateFolder {
            path: target.absolute_path.clone(),
            source,
        })?;
        debug!(path = ?target.absolute_path, "target folder created");
        Ok(())
    }

    async fn run_init(&self, target: &TargetSpec) -> Result<(), ScaffoldError> {
        let init = self
            .initializer
            .initialize(&target.absolute_path, &target.requested_name);
        let result = match self.init_timeout {
            Some(limit) => tokio::time::timeout(limit, init)
                .await
                .map_err(|_| ScaffoldError::InitTimedOut { timeout: limit })?,
            None => init.await,
        };
        result.map_err(ScaffoldError::InitFailed)
    }
}
