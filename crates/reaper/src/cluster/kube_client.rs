use std::path::PathBuf;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::cluster::ClusterError;

/// Builds an authenticated client.
///
/// With a kubeconfig path the client is configured from that file, otherwise
/// the pod's service account is used against `kubernetes.default.svc`.
///
/// # Errors
///
/// - [`ClusterError::ConnectionFailed`] if no usable credentials are found
pub async fn init_kube_client(
    kubeconfig: Option<PathBuf>,
) -> Result<Client, Report<ClusterError>> {
    let config = match kubeconfig {
        Some(kubeconfig_path) => {
            tracing::info!("Loading kubeconfig from {}", kubeconfig_path.display());
            let kubeconfig = Kubeconfig::read_from(&kubeconfig_path).change_context(
                ClusterError::ConnectionFailed {
                    message: format!(
                        "Failed to read kubeconfig file: {}",
                        kubeconfig_path.display()
                    ),
                },
            )?;

            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .change_context(ClusterError::ConnectionFailed {
                    message: format!(
                        "Failed to authenticate via kubeconfig: {}",
                        kubeconfig_path.display()
                    ),
                })?
        }
        None => {
            tracing::info!("Checking for service account token");
            Config::incluster_dns().change_context(ClusterError::ConnectionFailed {
                message: "Failed to authenticate in-cluster".to_string(),
            })?
        }
    };

    Client::try_from(config).change_context(ClusterError::ConnectionFailed {
        message: "Failed to create Kubernetes client".to_string(),
    })
}
