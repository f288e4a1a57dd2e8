//! Candidate discovery.
//!
//! Lists namespaces and pods and applies the configured inclusion rules. Only
//! identities leave this module; the evaluator fetches the full state itself.

use std::collections::BTreeSet;
use std::sync::Arc;

use error_stack::Report;
use tracing::error;

use crate::cluster::ClusterError;
use crate::cluster::PodApi;
use crate::cluster::PodRef;
use crate::config::ScanConfig;

pub struct Enumerator {
    api: Arc<dyn PodApi>,
    namespaces: BTreeSet<String>,
    pod_name_prefixes: Vec<String>,
}

impl Enumerator {
    pub fn new(api: Arc<dyn PodApi>, config: &ScanConfig) -> Self {
        Self {
            api,
            namespaces: config.namespaces.clone(),
            pod_name_prefixes: config.pod_name_prefixes.clone(),
        }
    }

    /// An empty namespace set selects every namespace.
    pub fn includes_namespace(&self, namespace: &str) -> bool {
        self.namespaces.is_empty() || self.namespaces.contains(namespace)
    }

    /// Case-sensitive prefix match; no prefixes selects every pod.
    pub fn includes_pod(&self, name: &str) -> bool {
        self.pod_name_prefixes.is_empty()
            || self
                .pod_name_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Namespaces to scan in this cycle.
    ///
    /// # Errors
    ///
    /// Returns the listing failure after logging it; the caller skips the cycle.
    pub async fn namespaces(&self) -> Result<Vec<String>, Report<ClusterError>> {
        let namespaces = self
            .api
            .list_namespaces()
            .await
            .inspect_err(|e| error!("Cannot list namespaces: {e:?}"))?;

        Ok(namespaces
            .into_iter()
            .filter(|namespace| self.includes_namespace(namespace))
            .collect())
    }

    /// Pods in `namespace` whose names match the configured prefixes.
    ///
    /// # Errors
    ///
    /// Returns the listing failure after logging it; the caller skips the namespace.
    pub async fn pods(&self, namespace: &str) -> Result<Vec<PodRef>, Report<ClusterError>> {
        let pods = self
            .api
            .list_pods(namespace)
            .await
            .inspect_err(|e| error!("Cannot list pods in namespace '{namespace}': {e:?}"))?;

        Ok(pods
            .into_iter()
            .filter(|pod| self.includes_pod(&pod.name))
            .collect())
    }
}
