use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use error_stack::fmt::ColorMode;
use error_stack::Report;
use reaper::clock::SystemClock;
use reaper::cluster::kube_client::init_kube_client;
use reaper::cluster::ClusterError;
use reaper::cluster::KubePodApi;
use reaper::config::Cli;
use reaper::config::ScanConfig;
use reaper::control_loop::ControlLoop;
use reaper::shutdown::ShutdownCoordinator;
use utils::logging;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

/// Logs the top-level cause; the full report is returned for the exit message.
fn startup_failure(context: &str, report: Report<ClusterError>) -> anyhow::Error {
    tracing::error!("{context}: {report}");
    anyhow::anyhow!("{context}: {report:?}")
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();
    // reports end up inside log records
    Report::set_color_mode(ColorMode::None);

    let cli = Cli::parse();
    let _guard = logging::init(cli.log_level, cli.log_format, cli.log_output);

    tracing::info!("Starting pod-reaper {}", &**version::VERSION);

    let config = ScanConfig::from(&cli);
    tracing::info!(
        dry_run = config.dry_run,
        grace_period = %humantime::format_duration(config.grace_period),
        interval = %humantime::format_duration(config.interval),
        startup_delay = %humantime::format_duration(config.startup_delay),
        namespaces = ?config.namespaces,
        pod_name_prefixes = ?config.pod_name_prefixes,
        remove_finalizers = config.remove_finalizers,
        "Configuration loaded"
    );

    let client = init_kube_client(cli.kubeconfig.clone())
        .await
        .map_err(|e| startup_failure("Cannot create Kubernetes client", e))?;

    let shutdown = ShutdownCoordinator::new();
    let _signals = shutdown.listen()?;

    let control_loop = ControlLoop::new(
        config,
        Arc::new(KubePodApi::new(client)),
        Arc::new(SystemClock),
    );
    control_loop.run(shutdown.token()).await;

    tracing::info!("Shutting down");
    Ok(())
}
