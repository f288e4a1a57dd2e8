use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::cli::Cli;

/// Scan settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Extra time granted on top of the pod's own termination grace period.
    pub grace_period: Duration,
    /// Pause between the end of one scan and the start of the next.
    pub interval: Duration,
    /// Pause before the first scan.
    pub startup_delay: Duration,
    /// Log intended removals without touching the cluster.
    pub dry_run: bool,
    /// Namespaces to scan; empty means all.
    pub namespaces: BTreeSet<String>,
    /// Pod name prefixes to consider; empty means all. An empty prefix matches every pod.
    pub pod_name_prefixes: Vec<String>,
    /// Clear finalizers before deleting. When false, pods with finalizers are left alone.
    pub remove_finalizers: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(60 * 60),
            interval: Duration::from_secs(5 * 60),
            startup_delay: Duration::from_secs(15 * 60),
            dry_run: false,
            namespaces: BTreeSet::new(),
            pod_name_prefixes: Vec::new(),
            remove_finalizers: true,
        }
    }
}

impl From<&Cli> for ScanConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            grace_period: cli.grace_period,
            interval: cli.interval,
            startup_delay: cli.startup_delay,
            dry_run: cli.dry_run,
            namespaces: cli
                .namespaces
                .iter()
                .map(|ns| ns.trim())
                .filter(|ns| !ns.is_empty())
                .map(str::to_string)
                .collect(),
            pod_name_prefixes: cli.pod_prefixes.clone(),
            remove_finalizers: !cli.no_remove_finalizers,
        }
    }
}
