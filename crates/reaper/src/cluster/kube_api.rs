use async_trait::async_trait;
use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::core::v1::Pod;
use kube::api::DeleteParams;
use kube::api::ListParams;
use kube::api::Patch;
use kube::api::PatchParams;
use kube::Api;
use kube::Client;
use serde_json::json;

use crate::cluster::ClusterError;
use crate::cluster::OwnerRef;
use crate::cluster::PodApi;
use crate::cluster::PodRef;
use crate::cluster::PodSnapshot;
use crate::cluster::DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS;

/// Page size for list requests, keeps single responses small on large clusters.
const LIST_PAGE_SIZE: u32 = 500;

/// [`PodApi`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubePodApi {
    client: Client,
}

impl KubePodApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl PodApi for KubePodApi {
    async fn list_namespaces(&self) -> Result<Vec<String>, Report<ClusterError>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let mut params = ListParams::default().limit(LIST_PAGE_SIZE);
        let mut names = Vec::new();

        loop {
            let page = api
                .list(&params)
                .await
                .change_context(ClusterError::Api {
                    message: "Failed to list namespaces".to_string(),
                })?;

            names.extend(page.items.into_iter().filter_map(|ns| ns.metadata.name));

            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<PodRef>, Report<ClusterError>> {
        let api = self.pods(namespace);
        let mut params = ListParams::default().limit(LIST_PAGE_SIZE);
        let mut pods = Vec::new();

        loop {
            let page = api
                .list(&params)
                .await
                .change_context(ClusterError::Api {
                    message: format!("Failed to list pods in namespace {namespace}"),
                })?;

            pods.extend(
                page.items
                    .into_iter()
                    .filter_map(|pod| pod.metadata.name)
                    .map(|name| PodRef::new(namespace, name)),
            );

            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => params = params.continue_token(&token),
                _ => break,
            }
        }

        Ok(pods)
    }

    async fn get_pod(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PodSnapshot, Report<ClusterError>> {
        let pod = self
            .pods(namespace)
            .get(name)
            .await
            .map_err(|e| ClusterError::from_pod_request(e, namespace, name, "get"))?;

        Ok(snapshot_from_pod(pod, namespace))
    }

    async fn update_pod(
        &self,
        snapshot: &PodSnapshot,
    ) -> Result<PodSnapshot, Report<ClusterError>> {
        let mut metadata = json!({ "finalizers": snapshot.finalizers });
        if let Some(resource_version) = &snapshot.resource_version {
            metadata["resourceVersion"] = json!(resource_version);
        }
        let patch = json!({ "metadata": metadata });

        let pod = self
            .pods(&snapshot.namespace)
            .patch(&snapshot.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| {
                ClusterError::from_pod_request(e, &snapshot.namespace, &snapshot.name, "update")
            })?;

        Ok(snapshot_from_pod(pod, &snapshot.namespace))
    }

    async fn delete_pod(
        &self,
        namespace: &str,
        name: &str,
        grace_period_seconds: u32,
    ) -> Result<(), Report<ClusterError>> {
        let params = DeleteParams {
            grace_period_seconds: Some(grace_period_seconds),
            ..DeleteParams::default()
        };

        self.pods(namespace)
            .delete(name, &params)
            .await
            .map_err(|e| ClusterError::from_pod_request(e, namespace, name, "delete"))?;

        Ok(())
    }
}

/// Converts an API object into the reaper's view of a pod.
///
/// `namespace` is used when the object itself carries none.
pub(crate) fn snapshot_from_pod(pod: Pod, namespace: &str) -> PodSnapshot {
    let metadata = pod.metadata;
    let termination_grace_period_seconds = pod
        .spec
        .and_then(|spec| spec.termination_grace_period_seconds)
        .map(|seconds| seconds.max(0) as u64)
        .unwrap_or(DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS);

    PodSnapshot {
        namespace: metadata
            .namespace
            .unwrap_or_else(|| namespace.to_string()),
        name: metadata.name.unwrap_or_default(),
        deletion_timestamp: metadata.deletion_timestamp.map(|time| time.0),
        termination_grace_period_seconds,
        finalizers: metadata.finalizers.unwrap_or_default(),
        owner_references: metadata
            .owner_references
            .unwrap_or_default()
            .into_iter()
            .map(|owner| OwnerRef {
                kind: owner.kind,
                name: owner.name,
            })
            .collect(),
        resource_version: metadata.resource_version,
    }
}
