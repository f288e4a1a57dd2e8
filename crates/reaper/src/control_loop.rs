//! Scan scheduling.
//!
//! ```text
//! StartupDelay ──▶ Scanning ──▶ Sleeping ──▶ Scanning ──▶ ...
//!      │              │            │
//!      └──────────────┴────────────┴──▶ Terminated (cancellation)
//! ```
//!
//! Waits race against the cancellation token, and a scan checks the token
//! before every namespace and every pod. A pod that is already being acted
//! upon is always finished first.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clock::Clock;
use crate::cluster::PodApi;
use crate::config::ScanConfig;
use crate::enumerator::Enumerator;
use crate::evaluator::PodOutcome;
use crate::evaluator::TerminationEvaluator;
use crate::shutdown::sleep_or_cancelled;

/// Tally of one scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    /// Namespaces could not be listed; the scan did nothing.
    pub namespace_listing_failed: bool,
    pub namespaces_scanned: usize,
    /// Namespaces whose pods could not be listed.
    pub namespaces_failed: usize,
    pub outcomes: BTreeMap<PodOutcome, usize>,
    /// Cancellation stopped the scan early.
    pub interrupted: bool,
}

impl ScanSummary {
    fn record(&mut self, outcome: PodOutcome) {
        *self.outcomes.entry(outcome).or_default() += 1;
    }

    pub fn count(&self, outcome: PodOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or_default()
    }

    pub fn pods_evaluated(&self) -> usize {
        self.outcomes.values().sum()
    }
}

/// Returned by [`ControlLoop::run`] once it has stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Scans that ran to the end; an interrupted scan is not counted.
    pub scans_completed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    StartupDelay,
    Scanning,
    Sleeping,
    Terminated,
}

/// Drives periodic scans until cancelled.
pub struct ControlLoop {
    config: ScanConfig,
    enumerator: Enumerator,
    evaluator: TerminationEvaluator,
}

impl ControlLoop {
    pub fn new(config: ScanConfig, api: Arc<dyn PodApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            enumerator: Enumerator::new(api.clone(), &config),
            evaluator: TerminationEvaluator::new(api, clock, &config),
            config,
        }
    }

    /// Runs until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) -> RunReport {
        let mut report = RunReport::default();
        let mut phase = if self.config.startup_delay.is_zero() {
            Phase::Scanning
        } else {
            Phase::StartupDelay
        };

        loop {
            phase = match phase {
                Phase::StartupDelay => {
                    // give a cluster that just came back up time to settle
                    info!(
                        "Sleeping for startup delay of {}",
                        humantime::format_duration(self.config.startup_delay)
                    );
                    self.wait(self.config.startup_delay, &token).await
                }
                Phase::Scanning => {
                    let summary = self.scan(&token).await;
                    if summary.interrupted {
                        Phase::Terminated
                    } else {
                        report.scans_completed += 1;
                        Phase::Sleeping
                    }
                }
                Phase::Sleeping => self.wait(self.config.interval, &token).await,
                Phase::Terminated => break,
            };
        }

        info!(
            scans_completed = report.scans_completed,
            "Control loop stopped"
        );
        report
    }

    async fn wait(&self, duration: std::time::Duration, token: &CancellationToken) -> Phase {
        if sleep_or_cancelled(duration, token).await {
            Phase::Scanning
        } else {
            Phase::Terminated
        }
    }

    /// Walks every selected namespace and evaluates its pods one at a time.
    pub async fn scan(&self, token: &CancellationToken) -> ScanSummary {
        info!("Checking for terminating pods");
        let mut summary = ScanSummary::default();

        let Ok(namespaces) = self.enumerator.namespaces().await else {
            summary.namespace_listing_failed = true;
            return summary;
        };

        for namespace in namespaces {
            if token.is_cancelled() {
                summary.interrupted = true;
                break;
            }

            let Ok(pods) = self.enumerator.pods(&namespace).await else {
                summary.namespaces_failed += 1;
                continue;
            };
            summary.namespaces_scanned += 1;

            for pod in pods {
                if token.is_cancelled() {
                    summary.interrupted = true;
                    break;
                }
                summary.record(self.evaluator.evaluate(&pod).await);
            }

            if summary.interrupted {
                break;
            }
        }

        info!(
            namespaces = summary.namespaces_scanned,
            namespaces_failed = summary.namespaces_failed,
            pods = summary.pods_evaluated(),
            force_deleted = summary.count(PodOutcome::ForceDeleted),
            would_force_delete = summary.count(PodOutcome::WouldForceDelete),
            interrupted = summary.interrupted,
            "Scan finished"
        );
        summary
    }
}
