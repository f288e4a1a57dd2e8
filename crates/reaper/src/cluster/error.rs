use core::error::Error;

use error_stack::Report;

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ClusterError {
    #[display("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[display("Pod not found: {name} in namespace {namespace}")]
    NotFound { namespace: String, name: String },
    #[display("Pod {name} in namespace {namespace} was modified concurrently")]
    Conflict { namespace: String, name: String },
    #[display("Kubernetes API request failed: {message}")]
    Api { message: String },
}

impl Error for ClusterError {}

impl ClusterError {
    /// Classifies a failed pod request by its HTTP status.
    pub(crate) fn from_pod_request(
        err: kube::Error,
        namespace: &str,
        name: &str,
        action: &str,
    ) -> Report<Self> {
        let context = match &err {
            kube::Error::Api(response) if response.code == 404 => Self::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(response) if response.code == 409 => Self::Conflict {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            _ => Self::Api {
                message: format!("Failed to {action} pod {name} in namespace {namespace}"),
            },
        };
        Report::new(err).change_context(context)
    }

    pub fn is_not_found(report: &Report<Self>) -> bool {
        matches!(report.current_context(), Self::NotFound { .. })
    }

    pub fn is_conflict(report: &Report<Self>) -> bool {
        matches!(report.current_context(), Self::Conflict { .. })
    }
}
