use std::{path::Path, process::Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to spawn init script `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("init script `{program}` exited with status {code:?}")]
    Exit { program: String, code: Option<i32> },
}

/// The opaque project initialization step run inside the new folder.
#[async_trait]
pub trait Initializer: Send + Sync {
    async fn initialize(&self, workdir: &Path, folder_name: &str) -> Result<(), InitError>;
}

/// Runs an external script with the folder name as its only argument.
///
/// `leading_args` go before the folder name so an interpreter can front the
/// script (`sh setup.sh <folder>`). The child shares the parent's stdio and is
/// killed if the run is abandoned.
#[derive(Debug, Clone)]
pub struct ScriptInitializer {
    program: String,
    leading_args: Vec<String>,
}

impl ScriptInitializer {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }
}

#[async_trait]
impl Initializer for ScriptInitializer {
    async fn initialize(&self, workdir: &Path, folder_name: &str) -> Result<(), InitError> {
        info!(program = %self.program, workdir = ?workdir, "running init script");
        let status = Command::new(&self.program)
            .args(&self.leading_args)
            .arg(folder_name)
            .current_dir(workdir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| InitError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(InitError::Exit {
                program: self.program.clone(),
                code: status.code(),
            });
        }
        Ok(())
    }
}
