//! # lope-logging
//!
//! Structured logging setup with `tracing`.
//!
//! Call [`init`] once at startup. The filter comes from `LOPE_LOG` (falling
//! back to `RUST_LOG`, then `info`), so per-crate levels work the usual way:
//! `LOPE_LOG=lope_runtime=debug,lope_llm=trace`.

#![deny(unsafe_code)]

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted first for the log filter.
pub const LOG_ENV_VAR: &str = "LOPE_LOG";

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the global subscriber with the env-derived filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with_default("info");
}

/// Install the global subscriber, using `default_directive` when neither
/// `LOPE_LOG` nor `RUST_LOG` is set.
pub fn init_with_default(default_directive: &str) {
    let _ = fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(true)
        .try_init();
}
