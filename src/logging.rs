use crate::config::AppConfig;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. Keep the guard alive until exit so the
/// file writer flushes.
///
/// Console output goes to stderr; stdout is reserved for benchmark results.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (subscriber, guard) = build_subscriber(config, std::io::stderr);
    subscriber.init();
    guard
}

/// File layer (JSON or text) plus a console layer writing to `console`.
fn build_subscriber<W>(
    config: &AppConfig,
    console: W,
) -> (impl Subscriber + Send + Sync + use<W>, WorkerGuard)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let json_file_layer = config.use_json.then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking.clone())
            .with_ansi(false)
    });
    let text_file_layer = (!config.use_json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(non_blocking.clone())
            .with_ansi(false)
    });
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(console)
        .with_ansi(!config.use_json);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(json_file_layer)
        .with(text_file_layer)
        .with(console_layer);

    (subscriber, guard)
}
