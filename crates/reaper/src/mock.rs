//! Test adapters implementing the dependency injection traits
//!
//! [`MockPodApi`] keeps pods in memory, records every call and can be told to
//! fail specific operations. It mimics the API server in one respect the
//! reaper depends on: once a pod marked for deletion has no finalizers left,
//! it disappears.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Duration as TimeDelta;
use chrono::TimeZone;
use chrono::Utc;
use error_stack::Report;
use tokio_util::sync::CancellationToken;
use tracing::Event;
use tracing::Level;
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Layer;

use crate::clock::Clock;
use crate::cluster::ClusterError;
use crate::cluster::OwnerRef;
use crate::cluster::PodApi;
use crate::cluster::PodRef;
use crate::cluster::PodSnapshot;

/// A call received by [`MockPodApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    ListNamespaces,
    ListPods(String),
    GetPod(PodRef),
    UpdatePod {
        pod: PodRef,
        finalizers: Vec<String>,
    },
    DeletePod {
        pod: PodRef,
        grace_period_seconds: u32,
    },
}

#[derive(Default)]
struct MockState {
    namespaces: BTreeSet<String>,
    pods: BTreeMap<PodRef, PodSnapshot>,
    calls: Vec<ApiCall>,
    fail_list_namespaces: bool,
    fail_list_pods: BTreeSet<String>,
    fail_get: BTreeSet<PodRef>,
    conflict_on_update: bool,
    fail_delete: bool,
    cancel_on_get: Option<(PodRef, CancellationToken)>,
}

/// In-memory cluster for tests
#[derive(Default)]
pub(crate) struct MockPodApi {
    state: Mutex<MockState>,
}

impl MockPodApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn add_namespace(&self, namespace: &str) {
        let mut state = self.state.lock().unwrap();
        state.namespaces.insert(namespace.to_string());
    }

    /// Stores a pod, creating its namespace if needed.
    pub(crate) fn insert_pod(&self, pod: PodSnapshot) {
        let mut state = self.state.lock().unwrap();
        state.namespaces.insert(pod.namespace.clone());
        state.pods.insert(pod.pod_ref(), pod);
    }

    pub(crate) fn contains_pod(&self, namespace: &str, name: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.pods.contains_key(&PodRef::new(namespace, name))
    }

    pub(crate) fn pod(&self, namespace: &str, name: &str) -> Option<PodSnapshot> {
        let state = self.state.lock().unwrap();
        state.pods.get(&PodRef::new(namespace, name)).cloned()
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn set_fail_list_namespaces(&self, fail: bool) {
        self.state.lock().unwrap().fail_list_namespaces = fail;
    }

    pub(crate) fn fail_list_pods(&self, namespace: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_list_pods.insert(namespace.to_string());
    }

    pub(crate) fn fail_get(&self, namespace: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_get.insert(PodRef::new(namespace, name));
    }

    pub(crate) fn set_conflict_on_update(&self, conflict: bool) {
        self.state.lock().unwrap().conflict_on_update = conflict;
    }

    pub(crate) fn set_fail_delete(&self, fail: bool) {
        self.state.lock().unwrap().fail_delete = fail;
    }

    /// Cancels `token` while serving the get request for the given pod.
    pub(crate) fn cancel_on_get(&self, namespace: &str, name: &str, token: CancellationToken) {
        let mut state = self.state.lock().unwrap();
        state.cancel_on_get = Some((PodRef::new(namespace, name), token));
    }

    /// Pods that were fetched, in call order.
    pub(crate) fn fetched(&self) -> Vec<PodRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::GetPod(pod) => Some(pod),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn mutating_calls(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    ApiCall::UpdatePod { .. } | ApiCall::DeletePod { .. }
                )
            })
            .collect()
    }
}

fn api_failure(message: &str) -> Report<ClusterError> {
    Report::new(ClusterError::Api {
        message: message.to_string(),
    })
}

fn not_found(pod: &PodRef) -> Report<ClusterError> {
    Report::new(ClusterError::NotFound {
        namespace: pod.namespace.clone(),
        name: pod.name.clone(),
    })
}

#[async_trait]
impl PodApi for MockPodApi {
    async fn list_namespaces(&self) -> Result<Vec<String>, Report<ClusterError>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::ListNamespaces);
        if state.fail_list_namespaces {
            return Err(api_failure("namespaces unavailable"));
        }
        Ok(state.namespaces.iter().cloned().collect())
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRef>, Report<ClusterError>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::ListPods(namespace.to_string()));
        if state.fail_list_pods.contains(namespace) {
            return Err(api_failure("pods unavailable"));
        }
        Ok(state
            .pods
            .keys()
            .filter(|pod| pod.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_pod(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PodSnapshot, Report<ClusterError>> {
        let pod = PodRef::new(namespace, name);
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::GetPod(pod.clone()));

        if let Some((target, token)) = &state.cancel_on_get {
            if *target == pod {
                token.cancel();
            }
        }
        if state.fail_get.contains(&pod) {
            return Err(api_failure("connection reset"));
        }
        state.pods.get(&pod).cloned().ok_or_else(|| not_found(&pod))
    }

    async fn update_pod(
        &self,
        snapshot: &PodSnapshot,
    ) -> Result<PodSnapshot, Report<ClusterError>> {
        let pod = snapshot.pod_ref();
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::UpdatePod {
            pod: pod.clone(),
            finalizers: snapshot.finalizers.clone(),
        });

        if state.conflict_on_update {
            return Err(Report::new(ClusterError::Conflict {
                namespace: pod.namespace.clone(),
                name: pod.name.clone(),
            }));
        }
        let Some(stored) = state.pods.get_mut(&pod) else {
            return Err(not_found(&pod));
        };
        stored.finalizers = snapshot.finalizers.clone();
        let updated = stored.clone();

        if updated.deletion_timestamp.is_some() && updated.finalizers.is_empty() {
            state.pods.remove(&pod);
        }
        Ok(updated)
    }

    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: u32,
    ) -> Result<(), Report<ClusterError>> {
        let pod = PodRef::new(namespace, name);
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::DeletePod {
            pod: pod.clone(),
            grace_period_seconds,
        });

        if state.fail_delete {
            return Err(api_failure("etcd timeout"));
        }
        match state.pods.remove(&pod) {
            Some(_) => Ok(()),
            None => Err(not_found(&pod)),
        }
    }
}

/// Clock frozen at a fixed instant.
pub(crate) struct MockClock(pub DateTime<Utc>);

impl MockClock {
    pub(crate) fn default_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self(Self::default_now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Builder for pod snapshots used across tests.
pub(crate) struct PodBuilder {
    snapshot: PodSnapshot,
}

impl PodBuilder {
    pub(crate) fn new(namespace: &str, name: &str) -> Self {
        Self {
            snapshot: PodSnapshot {
                namespace: namespace.to_string(),
                name: name.to_string(),
                deletion_timestamp: None,
                termination_grace_period_seconds: 30,
                finalizers: Vec::new(),
                owner_references: Vec::new(),
                resource_version: Some("1".to_string()),
            },
        }
    }

    /// Marks the pod as deleted `ago` before [`MockClock::default_now`].
    pub(crate) fn terminating_for(mut self, ago: TimeDelta) -> Self {
        self.snapshot.deletion_timestamp = Some(MockClock::default_now() - ago);
        self
    }

    pub(crate) fn grace_seconds(mut self, seconds: u64) -> Self {
        self.snapshot.termination_grace_period_seconds = seconds;
        self
    }

    pub(crate) fn finalizers(mut self, finalizers: &[&str]) -> Self {
        self.snapshot.finalizers = finalizers.iter().map(|f| f.to_string()).collect();
        self
    }

    pub(crate) fn owned_by(mut self, kind: &str, name: &str) -> Self {
        self.snapshot.owner_references.push(OwnerRef {
            kind: kind.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub(crate) fn build(self) -> PodSnapshot {
        self.snapshot
    }
}

/// Counts warning and error events on the current thread.
#[derive(Clone, Default)]
pub(crate) struct LevelCounter {
    warnings: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
}

impl LevelCounter {
    /// Installs the counter as the thread's default subscriber until the guard drops.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub(crate) fn warnings(&self) -> usize {
        self.warnings.load(Ordering::SeqCst)
    }

    pub(crate) fn errors(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for LevelCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level == Level::WARN {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        } else if level == Level::ERROR {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }
}
