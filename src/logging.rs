use anyhow::{anyhow, Context};
use std::io;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::{LogFormat, SidecarConfig};

/// Install the global subscriber. Logs go to stderr; stdout carries the
/// protocol. `RUST_LOG` wins over the configured level.
pub fn init(config: &SidecarConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("failed to configure tracing level")?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.log_format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(false)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };
    result.map_err(|e| anyhow!("logging already initialized: {e}"))
}
