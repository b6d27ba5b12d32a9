use std::path::PathBuf;

use directories::ProjectDirs;
use tracing::{debug, level_filters::LevelFilter};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// How the process wants to be traced.
#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Names the log directory and the log file.
    pub app_name: String,
    /// Default level when `RUST_LOG` is not set.
    pub level: LevelFilter,
    /// Also write a daily rolling log file under the project data directory.
    pub log_file: bool,
}

/// Initializes the `tracing` logging framework.
///
/// Events go to stderr so that stdout stays free for rendered configuration.
/// Output is influenced by the optional
/// [`RUST_LOG`](tracing_subscriber::filter::EnvFilter) environment variable
/// and falls back to `options.level`.
///
/// The returned guard flushes the log file when dropped; keep it alive for the
/// lifetime of the process.
pub fn init(options: TracingOptions) -> Option<WorkerGuard> {
    let filter = Targets::new()
        .with_default(LevelFilter::TRACE)
        .with_target("reqwest", LevelFilter::OFF)
        .with_target("hyper_util", LevelFilter::OFF)
        .with_target("rustls", LevelFilter::OFF);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(create_env_filter(options.level))
        .boxed();

    let mut guard = None;
    let log_dir = options
        .log_file
        .then(|| get_log_dir(&options.app_name))
        .flatten();

    let file_layer = log_dir.as_ref().map(|log_dir| {
        let file_appender =
            tracing_appender::rolling::daily(log_dir, format!("{}.log", options.app_name));
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .compact()
            .with_writer(non_blocking)
            .with_filter(create_env_filter(options.level))
            .boxed()
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter)
        .init();

    if let Some(log_dir) = log_dir {
        debug!("logs directory {log_dir:?}");
    }

    guard
}

fn create_env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn get_log_dir(app_name: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", app_name).map(|dirs| dirs.data_dir().join("logs"))
}
