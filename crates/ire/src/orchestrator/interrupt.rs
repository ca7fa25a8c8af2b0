use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::{sync::Notify, task::JoinHandle};
use tracing::{error, warn};

/// Sticky cancellation signal shared between the signal listener and the
/// orchestrator. Once triggered every current and future `wait` resolves.
#[derive(Clone, Default)]
pub struct Interrupt {
    fired: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.fired.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        // Registered before the flag check so a trigger in between is not lost.
        let notified = self.notify.notified();
        if self.is_triggered() {
            return;
        }
        notified.await;
    }
}

/// Forwards SIGINT (and SIGTERM on unix) to `interrupt`. Keeps listening
/// afterwards so repeated signals are reported instead of silently absorbed.
pub fn spawn_signal_listener(interrupt: Interrupt) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match wait_for_signal().await {
                Ok(signal) if interrupt.is_triggered() => {
                    warn!(signal, "interrupt already pending, waiting for npm config restore");
                }
                Ok(signal) => {
                    warn!(signal, "interrupt received");
                    interrupt.trigger();
                }
                Err(err) => {
                    error!(error = ?err, "failed to listen for signals");
                    return;
                }
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}
