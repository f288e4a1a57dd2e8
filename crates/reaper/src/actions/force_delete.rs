use std::sync::Arc;

use tracing::error;
use tracing::warn;

use crate::cluster::ClusterError;
use crate::cluster::PodApi;
use crate::cluster::PodRef;

/// Grace period sent with every delete; zero skips graceful termination.
pub const FORCE_DELETE_GRACE_PERIOD_SECONDS: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The pod was gone already, usually because clearing its finalizers finished the deletion.
    AlreadyGone,
    Failed,
}

impl DeleteOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Deleted | Self::AlreadyGone)
    }
}

/// Issues zero grace period deletes.
pub struct ForceDeleter {
    api: Arc<dyn PodApi>,
}

impl ForceDeleter {
    pub fn new(api: Arc<dyn PodApi>) -> Self {
        Self { api }
    }

    /// Deletes the pod immediately. Failures are logged and not retried.
    pub async fn delete(&self, pod: &PodRef) -> DeleteOutcome {
        match self
            .api
            .delete_pod(&pod.namespace, &pod.name, FORCE_DELETE_GRACE_PERIOD_SECONDS)
            .await
        {
            Ok(()) => {
                warn!("{pod} has been force deleted");
                DeleteOutcome::Deleted
            }
            Err(e) if ClusterError::is_not_found(&e) => {
                warn!("{pod} has been force deleted");
                DeleteOutcome::AlreadyGone
            }
            Err(e) => {
                error!("{pod}: Cannot force delete: {e:?}");
                DeleteOutcome::Failed
            }
        }
    }
}
