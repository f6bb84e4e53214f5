//! Log output for the binary.
//!
//! Events from the engine (enabled through `antiprime/tracing`) and from this
//! crate go through one `tracing_subscriber` registry:
//!
//! - verbosity comes from `RUST_LOG` and defaults to `info`
//! - lines are written to stderr so stdout carries only the sequence
//! - `LOG_FORMAT` picks `pretty`, `compact` or `json` lines
//!
//! ```bash
//! RUST_LOG=antiprime=debug LOG_FORMAT=json antiprimes --count 20
//! ```

use crate::config::LogFormat;
use std::io;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_file(true)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_thread_names(true)
                    .with_target(false)
                    .compact(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_thread_names(true)
                    .json(),
            )
            .try_init()?,
    }

    Ok(())
}
