//! Shutdown coordination.
//!
//! A single background task listens for SIGINT/SIGTERM and cancels a shared
//! [`CancellationToken`]. The token is raised once and never reset; every wait
//! point in the reaper races its timer against it, and the scan loop polls it
//! between pods.

use std::io;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owner of the process-wide cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle observed by the control loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Raises the cancellation signal.
    ///
    /// Returns `false` if it had already been raised, in which case nothing happens.
    pub fn trigger(&self, signal: &str) -> bool {
        if self.token.is_cancelled() {
            tracing::debug!("Signal received: {signal}, shutdown already in progress");
            return false;
        }

        tracing::info!("Signal received: {signal}, initiating graceful shutdown");
        self.token.cancel();
        true
    }

    /// Spawns the signal listener. Must be called from within the tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails if the signal handlers cannot be registered.
    pub fn listen(&self) -> io::Result<JoinHandle<()>> {
        let coordinator = self.clone();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate())?;
            let mut sigint = signal(SignalKind::interrupt())?;

            Ok(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        received = sigterm.recv() => {
                            if received.is_none() {
                                break;
                            }
                            coordinator.trigger("SIGTERM");
                        }
                        received = sigint.recv() => {
                            if received.is_none() {
                                break;
                            }
                            coordinator.trigger("SIGINT");
                        }
                    }
                }
            }))
        }
        #[cfg(not(unix))]
        {
            Ok(tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    coordinator.trigger("Ctrl+C");
                }
            }))
        }
    }
}

/// Sleeps for `duration` unless `token` is cancelled first.
///
/// Returns `true` if the full duration elapsed, `false` on cancellation.
/// An already cancelled token wins even against a zero duration.
pub async fn sleep_or_cancelled(duration: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
