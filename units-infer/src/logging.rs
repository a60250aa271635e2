#![forbid(unsafe_code)]

//! Subscriber setup for the `units-infer` binary.
//!
//! `RUST_LOG` wins over the manifest's `[logging] filter`. Output always goes
//! to stderr so reports on stdout stay machine-readable.

use tracing_subscriber::EnvFilter;

use crate::manifest::LoggingConfig;

pub fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(config))
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
