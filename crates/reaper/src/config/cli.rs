use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use utils::logging::LogFormat;
use utils::logging::LogLevel;
use utils::logging::LogOutput;
use utils::version;

/// Force deletes pods that have been stuck in Terminating for too long.
#[derive(Parser, Debug, Clone)]
#[command(name = "pod-reaper", version = &**version::VERSION)]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "POD_REAPER_DRY_RUN",
        help = "If set, do not delete anything"
    )]
    pub dry_run: bool,

    #[arg(
        short = 'g',
        long,
        env = "POD_REAPER_GRACE_PERIOD",
        default_value = "1h",
        value_parser = humantime::parse_duration,
        help = "Additional grace period added to that of the pod, e.g. 2m, 1h"
    )]
    pub grace_period: Duration,

    #[arg(
        short = 'i',
        long,
        env = "POD_REAPER_INTERVAL",
        default_value = "5m",
        value_parser = humantime::parse_duration,
        help = "Interval between scans of the cluster, e.g. 2m, 1h"
    )]
    pub interval: Duration,

    #[arg(
        short = 'k',
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file. If not set, in-cluster authentication is attempted"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        short = 'n',
        long,
        env = "POD_REAPER_NAMESPACES",
        value_delimiter = ',',
        help = "Namespaces to limit scans to. If not set, all namespaces are scanned"
    )]
    pub namespaces: Vec<String>,

    #[arg(
        short = 'p',
        long = "pods",
        env = "POD_REAPER_POD_PREFIXES",
        value_delimiter = ',',
        help = "Pod name prefixes. If set, only pods whose names begin with one of them are considered"
    )]
    pub pod_prefixes: Vec<String>,

    #[arg(
        short = 'r',
        long,
        env = "POD_REAPER_NO_REMOVE_FINALIZERS",
        help = "If set, do not remove finalizers; pods that have any are left alone"
    )]
    pub no_remove_finalizers: bool,

    #[arg(
        short = 's',
        long,
        env = "POD_REAPER_STARTUP_DELAY",
        default_value = "15m",
        value_parser = humantime::parse_duration,
        help = "Time to wait between launch and the first scan, e.g. 2m, 1h"
    )]
    pub startup_delay: Duration,

    #[arg(
        short = 'l',
        long,
        env = "POD_REAPER_LOG_LEVEL",
        value_enum,
        default_value_t = LogLevel::Info,
        help = "Log level"
    )]
    pub log_level: LogLevel,

    #[arg(
        short = 'f',
        long,
        env = "POD_REAPER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Logfmt,
        help = "Log format"
    )]
    pub log_format: LogFormat,

    #[arg(
        short = 'o',
        long,
        env = "POD_REAPER_LOG_OUTPUT",
        value_enum,
        default_value_t = LogOutput::Stdout,
        help = "Log output stream"
    )]
    pub log_output: LogOutput,
}
