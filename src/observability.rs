//! Tracing setup for the hub binaries.
//!
//! Logs go to stderr so stdout stays free for rendered output and NDJSON.
//! `HUB_LOG` takes an `EnvFilter` directive (default `exchange_hub=warn`);
//! `HUB_LOG_JSON=1` switches to JSON lines.

use crate::config::{LOG_ENV, LOG_JSON_ENV};
use std::env;
use std::io;
use tracing_subscriber::{EnvFilter, prelude::*};

const DEFAULT_FILTER: &str = "exchange_hub=warn";

/// Call once at process startup. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = if log_json() {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true),
            )
            .try_init()
    };
}

fn log_json() -> bool {
    env::var(LOG_JSON_ENV)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
