use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{init_step::InitError, swap::ConfigPair, swap::KeyError};

/// Why an invocation ended without a scaffolded project.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("The folder {name} is already exist, Please change the folder name.")]
    TargetConflict { name: String, path: PathBuf },

    #[error("failed to read the current npm config")]
    ConfigRead(#[source] KeyError),

    #[error("failed to apply the mirror npm config")]
    ConfigWrite(#[source] KeyError),

    #[error("failed to create folder {}", .path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("init step failed")]
    InitFailed(#[source] InitError),

    #[error("init step timed out after {}s", .timeout.as_secs())]
    InitTimedOut { timeout: Duration },

    #[error(
        "failed to restore npm config; set it back by hand: registry={}, disturl={}",
        .original.registry,
        .original.dist_url
    )]
    Restore {
        original: ConfigPair,
        #[source]
        source: KeyError,
    },

    #[error(
        "npm config restore did not finish within {}s; set it back by hand: registry={}, disturl={}",
        .timeout.as_secs(),
        .original.registry,
        .original.dist_url
    )]
    RestoreTimedOut {
        original: ConfigPair,
        timeout: Duration,
    },

    #[error("interrupted")]
    Interrupted { config_touched: bool },
}

impl ScaffoldError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ScaffoldError::TargetConflict { .. } => 2,
            ScaffoldError::ConfigRead(_) => 3,
            ScaffoldError::ConfigWrite(_) => 4,
            ScaffoldError::CreateFolder { .. } | ScaffoldError::InitFailed(_) => 5,
            ScaffoldError::InitTimedOut { .. } => 6,
            ScaffoldError::Restore { .. } | ScaffoldError::RestoreTimedOut { .. } => 7,
            ScaffoldError::Interrupted { .. } => 130,
        }
    }

    /// Whether the npm config may have been touched before this error.
    pub fn touched_config(&self) -> bool {
        match self {
            ScaffoldError::TargetConflict { .. } | ScaffoldError::ConfigRead(_) => false,
            ScaffoldError::Interrupted { config_touched } => *config_touched,
            _ => true,
        }
    }
}
