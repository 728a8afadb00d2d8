use anyhow::Context;
use tracing::Level;
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Failed to create log filter")?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false).compact()).try_init(),
    };
    result.context("Failed to install tracing subscriber")
}

/// Run `f` with a warn-level stderr subscriber in scope, for work done
/// before `init` has read the logging configuration.
pub fn during_startup<T>(f: impl FnOnce() -> T) -> T {
    tracing::subscriber::with_default(startup_subscriber(std::io::stderr), f)
}

fn startup_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::Subscriber::builder()
        .with_writer(writer)
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .compact()
        .finish()
}
