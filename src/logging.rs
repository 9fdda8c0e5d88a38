//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{QaError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` wins over the configured level; `verbosity` raises the level
/// to debug (1) or trace (2+).
pub fn init_tracing(config: &LoggingConfig, verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("doc_qa={},warn", level)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| QaError::Configuration(format!("tracing init failed: {}", e)))
}
