use std::sync::Arc;

use tracing::warn;

use crate::cluster::ClusterError;
use crate::cluster::PodApi;
use crate::cluster::PodSnapshot;

/// Result of trying to clear a pod's finalizers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizerOutcome {
    /// The pod had none, no request was made.
    NoneToRemove,
    /// The listed finalizers were cleared.
    Removed(Vec<String>),
    /// Finalizer removal is disabled and the pod has some.
    RetainedByPolicy,
    /// The pod changed since it was fetched; the update was rejected.
    Conflicted,
    /// The update failed for any other reason.
    UpdateFailed,
}

impl FinalizerOutcome {
    /// Whether the pod may be force deleted next.
    pub fn allows_delete(&self) -> bool {
        matches!(self, Self::NoneToRemove | Self::Removed(_))
    }
}

/// Clears finalizers that would otherwise block a force delete.
pub struct FinalizerRemover {
    api: Arc<dyn PodApi>,
    enabled: bool,
}

impl FinalizerRemover {
    pub fn new(api: Arc<dyn PodApi>, enabled: bool) -> Self {
        Self { api, enabled }
    }

    /// Submits an update with an empty finalizer list.
    ///
    /// The update carries the snapshot's resource version, so a pod changed
    /// since it was fetched is reported as [`FinalizerOutcome::Conflicted`]
    /// and left for the next scan.
    pub async fn remove(&self, pod: &PodSnapshot) -> FinalizerOutcome {
        if pod.finalizers.is_empty() {
            return FinalizerOutcome::NoneToRemove;
        }

        let pod_ref = pod.pod_ref();
        if !self.enabled {
            warn!("{pod_ref}: Cannot delete as pod has finalizers");
            return FinalizerOutcome::RetainedByPolicy;
        }

        let mut cleared = pod.clone();
        let removed = std::mem::take(&mut cleared.finalizers);

        match self.api.update_pod(&cleared).await {
            Ok(_) => {
                warn!("{pod_ref}: Removed finalizers: {removed:?}");
                FinalizerOutcome::Removed(removed)
            }
            Err(e) if ClusterError::is_conflict(&e) => {
                warn!("{pod_ref}: Cannot remove finalizers, pod was modified since it was fetched");
                FinalizerOutcome::Conflicted
            }
            Err(e) => {
                warn!("{pod_ref}: Cannot remove finalizers: {e:?}");
                FinalizerOutcome::UpdateFailed
            }
        }
    }
}
