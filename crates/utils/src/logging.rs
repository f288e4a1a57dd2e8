//! provides logging helpers

use std::fmt;
use std::io;

use tracing::field::Field;
use tracing::field::Visit;
use tracing::Event;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::fmt::FormattedFields;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;
use tracing_subscriber::registry::LookupSpan;

/// Minimum severity written to the log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => filter::LevelFilter::DEBUG,
            LogLevel::Info => filter::LevelFilter::INFO,
            LogLevel::Warn => filter::LevelFilter::WARN,
            LogLevel::Error => filter::LevelFilter::ERROR,
        }
    }
}

/// Encoding of each log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Plain `key=value` text
    #[default]
    Logfmt,
}

/// Stream the log lines are written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
}

/// Writes one `key=value` line per event:
/// `ts=... level=info target=... msg="..." <span fields> <event fields>`.
pub struct LogfmtFormatter<T = SystemTime> {
    timer: T,
}

impl Default for LogfmtFormatter {
    fn default() -> Self {
        Self { timer: SystemTime }
    }
}

impl<T> LogfmtFormatter<T> {
    pub fn with_timer(timer: T) -> Self {
        Self { timer }
    }
}

#[derive(Default)]
struct LogfmtVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl LogfmtVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name(), value));
        }
    }
}

impl Visit for LogfmtVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

/// Quotes values that would otherwise break the line into extra pairs.
fn write_value(writer: &mut Writer<'_>, value: &str) -> fmt::Result {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c == ' ' || c == '=' || c == '"' || c.is_control());
    if needs_quotes {
        write!(writer, "{value:?}")
    } else {
        writer.write_str(value)
    }
}

impl<S, N, T> FormatEvent<S, N> for LogfmtFormatter<T>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    T: FormatTime,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        writer.write_str("ts=")?;
        self.timer.format_time(&mut writer)?;
        write!(
            writer,
            " level={}",
            metadata.level().as_str().to_ascii_lowercase()
        )?;
        writer.write_str(" target=")?;
        write_value(&mut writer, metadata.target())?;

        let mut visitor = LogfmtVisitor::default();
        event.record(&mut visitor);

        if let Some(message) = &visitor.message {
            writer.write_str(" msg=")?;
            write_value(&mut writer, message)?;
        }

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(fields) = extensions.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, " {fields}")?;
                    }
                }
            }
        }

        for (key, value) in &visitor.fields {
            write!(writer, " {key}=")?;
            write_value(&mut writer, value)?;
        }

        writeln!(writer)
    }
}

/// initiate the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `level` when set. The returned guard
/// flushes buffered lines on drop and must be held for the process lifetime.
pub fn init(level: LogLevel, format: LogFormat, output: LogOutput) -> WorkerGuard {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::from(level).into())
        .from_env_lossy();

    let (writer, guard) = match output {
        LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
    };

    match format {
        LogFormat::Json => registry()
            .with(
                layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_filter(env_filter),
            )
            .init(),
        LogFormat::Logfmt => registry()
            .with(
                layer()
                    .event_format(LogfmtFormatter::default())
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(env_filter),
            )
            .init(),
    }

    guard
}
