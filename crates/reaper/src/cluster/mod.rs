//! Cluster access.
//!
//! The reaper never talks to the API server directly. Everything goes through
//! [`PodApi`], which has a Kubernetes implementation ([`KubePodApi`]) and an
//! in-memory one used by the tests.
//!
//! The main components are:
//! - [`PodApi`]: list/get/update/delete operations on namespaces and pods
//! - [`PodRef`]: bare identity produced by listing
//! - [`PodSnapshot`]: authoritative state fetched right before a decision
//! - [`ClusterError`]: failure classification (not found, conflict, ...)

pub mod error;
pub mod kube_api;
pub mod kube_client;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use error_stack::Report;

pub use error::ClusterError;
pub use kube_api::KubePodApi;

/// Owner kind that marks a pod as static (mirrored from a node's manifest).
pub const NODE_OWNER_KIND: &str = "Node";

/// Grace period the API server assigns when a pod spec does not set one.
pub const DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS: u64 = 30;

/// Identity of a pod, as produced by listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("Pod '{name}' in namespace '{namespace}'")]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl PodRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

/// Pod state as fetched from the cluster. Never cached across scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSnapshot {
    pub namespace: String,
    pub name: String,
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub termination_grace_period_seconds: u64,
    pub finalizers: Vec<String>,
    pub owner_references: Vec<OwnerRef>,
    /// Used as a precondition on update so concurrent writers surface as conflicts.
    pub resource_version: Option<String>,
}

impl PodSnapshot {
    pub fn pod_ref(&self) -> PodRef {
        PodRef::new(&self.namespace, &self.name)
    }

    /// Static pods are owned by their node and cannot be removed through the API.
    pub fn is_static(&self) -> bool {
        self.owner_references
            .iter()
            .any(|owner| owner.kind == NODE_OWNER_KIND)
    }
}

/// Operations the reaper needs from the cluster.
///
/// Calls are awaited one at a time; timeouts and retries, if any, belong to
/// the implementation.
#[async_trait]
pub trait PodApi: Send + Sync {
    /// Names of all namespaces.
    async fn list_namespaces(&self) -> Result<Vec<String>, Report<ClusterError>>;

    /// Identities of all pods in `namespace`.
    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRef>, Report<ClusterError>>;

    /// Current state of a single pod.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::NotFound`] if the pod no longer exists
    async fn get_pod(&self, namespace: &str, name: &str)
        -> Result<PodSnapshot, Report<ClusterError>>;

    /// Writes the snapshot's finalizers back to the cluster.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::Conflict`] if the pod changed since the snapshot was taken
    async fn update_pod(&self, snapshot: &PodSnapshot)
        -> Result<PodSnapshot, Report<ClusterError>>;

    /// Deletes a pod with an explicit grace period.
    ///
    /// # Errors
    ///
    /// - [`ClusterError::NotFound`] if the pod is already gone
    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: u32,
    ) -> Result<(), Report<ClusterError>>;
}
