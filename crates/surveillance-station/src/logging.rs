use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

/// Installs the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init_logging(logging_config: Option<LoggingConfig>) {
    let (filter, ansi) = match logging_config {
        Some(config) => (
            config.filter.unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            config.ansi,
        ),
        None => (DEFAULT_FILTER.to_string(), true),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(ansi).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}
