use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::{
    swap::{ConfigPair, ConfigSwap, KeyError},
    target::TargetSpec,
};

/// Everything one run of the tool knows once the npm config is captured.
#[derive(Debug)]
pub struct InvocationState {
    original: ConfigPair,
    target: TargetSpec,
    restored: AtomicBool,
}

impl InvocationState {
    pub fn new(original: ConfigPair, target: TargetSpec) -> Self {
        Self {
            original,
            target,
            restored: AtomicBool::new(false),
        }
    }

    pub fn original(&self) -> &ConfigPair {
        &self.original
    }

    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    pub fn is_restored(&self) -> bool {
        self.restored.load(Ordering::SeqCst)
    }

    /// Puts the captured pair back. Only the first caller touches npm; every
    /// later call returns `Ok(false)` without side effects.
    pub async fn restore_once(&self, swap: &ConfigSwap) -> Result<bool, KeyError> {
        if self.restored.swap(true, Ordering::SeqCst) {
            debug!("npm config already restored");
            return Ok(false);
        }
        swap.restore(&self.original).await?;
        info!(
            registry = %self.original.registry,
            dist_url = %self.original.dist_url,
            "npm config restored"
        );
        Ok(true)
    }
}
