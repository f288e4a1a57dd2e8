//! Per-pod termination decisions.
//!
//! The evaluator receives a bare [`PodRef`] from the enumerator and fetches
//! the pod again before deciding, so a decision is always based on the
//! freshest state available rather than on the (possibly stale) listing.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono::Duration as TimeDelta;
use chrono::Utc;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::actions::FinalizerRemover;
use crate::actions::ForceDeleter;
use crate::clock::Clock;
use crate::cluster::ClusterError;
use crate::cluster::PodApi;
use crate::cluster::PodRef;
use crate::cluster::PodSnapshot;
use crate::config::ScanConfig;

/// Where a pod stands relative to its termination deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// No deletion timestamp.
    NotTerminating,
    /// Owned by a node; must never be removed this way.
    Static,
    WithinGracePeriod {
        elapsed: TimeDelta,
        allowed: Duration,
    },
    /// Terminating for longer than its synthetic grace period.
    Overdue {
        elapsed: TimeDelta,
        allowed: Duration,
    },
}

/// Checks a pod against its synthetic grace period, the pod's own
/// termination grace period plus `grace_period`.
///
/// A pod is overdue only when strictly more time than allowed has elapsed.
pub fn assess(pod: &PodSnapshot, grace_period: Duration, now: DateTime<Utc>) -> Assessment {
    let Some(deleted_at) = pod.deletion_timestamp else {
        return Assessment::NotTerminating;
    };

    if pod.is_static() {
        return Assessment::Static;
    }

    let allowed =
        Duration::from_secs(pod.termination_grace_period_seconds).saturating_add(grace_period);
    let elapsed = now - deleted_at;

    // an allowance too large to represent can never be exceeded
    let overdue = TimeDelta::from_std(allowed)
        .map(|allowed| elapsed > allowed)
        .unwrap_or(false);

    if overdue {
        Assessment::Overdue { elapsed, allowed }
    } else {
        Assessment::WithinGracePeriod { elapsed, allowed }
    }
}

/// What happened to a pod during one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PodOutcome {
    /// The pod could not be fetched; skipped until the next scan.
    FetchFailed,
    NotTerminating,
    StaticPod,
    WithinGracePeriod,
    /// Dry run: the pod qualified but nothing was changed.
    WouldForceDelete,
    /// Finalizers could not be or were not allowed to be cleared; no delete was attempted.
    FinalizersRetained,
    ForceDeleted,
    DeleteFailed,
}

/// Decides whether a pod is stuck in Terminating and removes it if so.
pub struct TerminationEvaluator {
    api: Arc<dyn PodApi>,
    clock: Arc<dyn Clock>,
    grace_period: Duration,
    dry_run: bool,
    finalizer_remover: FinalizerRemover,
    force_deleter: ForceDeleter,
}

impl TerminationEvaluator {
    pub fn new(api: Arc<dyn PodApi>, clock: Arc<dyn Clock>, config: &ScanConfig) -> Self {
        Self {
            finalizer_remover: FinalizerRemover::new(api.clone(), config.remove_finalizers),
            force_deleter: ForceDeleter::new(api.clone()),
            api,
            clock,
            grace_period: config.grace_period,
            dry_run: config.dry_run,
        }
    }

    /// Evaluates a single pod. Once a mutation has started, the whole
    /// update/delete sequence runs to completion.
    #[tracing::instrument(skip(self, pod), fields(namespace = %pod.namespace, pod = %pod.name))]
    pub async fn evaluate(&self, pod: &PodRef) -> PodOutcome {
        let snapshot = match self.api.get_pod(&pod.namespace, &pod.name).await {
            Ok(snapshot) => snapshot,
            Err(e) if ClusterError::is_not_found(&e) => {
                debug!("{pod} no longer exists");
                return PodOutcome::FetchFailed;
            }
            Err(e) => {
                error!("{pod}: Cannot get pod details: {e:?}");
                return PodOutcome::FetchFailed;
            }
        };

        match assess(&snapshot, self.grace_period, self.clock.now()) {
            Assessment::NotTerminating => PodOutcome::NotTerminating,
            Assessment::Static => {
                warn!("{pod}: Cannot terminate static pod");
                PodOutcome::StaticPod
            }
            Assessment::WithinGracePeriod { elapsed, allowed } => {
                debug!(
                    "{pod} has been terminating for {}, within grace period of {}",
                    format_elapsed(elapsed),
                    humantime::format_duration(allowed)
                );
                PodOutcome::WithinGracePeriod
            }
            Assessment::Overdue { elapsed, allowed } => {
                warn!(
                    "{pod} has been terminating for {}, which exceeds grace period of {}. Force deleting...",
                    format_elapsed(elapsed),
                    humantime::format_duration(allowed)
                );
                self.force_remove(&snapshot).await
            }
        }
    }

    async fn force_remove(&self, snapshot: &PodSnapshot) -> PodOutcome {
        let pod = snapshot.pod_ref();

        if self.dry_run {
            warn!(
                "{pod} with finalizers {:?} would be force deleted",
                snapshot.finalizers
            );
            return PodOutcome::WouldForceDelete;
        }

        if !self.finalizer_remover.remove(snapshot).await.allows_delete() {
            return PodOutcome::FinalizersRetained;
        }

        if self.force_deleter.delete(&pod).await.is_success() {
            PodOutcome::ForceDeleted
        } else {
            PodOutcome::DeleteFailed
        }
    }
}

/// Elapsed time rounded to the nearest second; negative durations show as zero.
fn format_elapsed(elapsed: TimeDelta) -> String {
    let seconds = u64::try_from((elapsed.num_milliseconds() + 500) / 1000).unwrap_or_default();
    humantime::format_duration(Duration::from_secs(seconds)).to_string()
}
