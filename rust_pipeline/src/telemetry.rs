//! Opt-in tracing subscriber for binaries, notebooks and the Python module.
//!
//! The library only emits `tracing` events; nothing is printed unless a
//! caller installs a subscriber, either its own or the one below.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Installs a global fmt subscriber filtered by `RUST_LOG`, or by
/// `default_filter` when the variable is unset or invalid.
pub fn init_tracing(default_filter: &str) -> Result<(), TelemetryError> {
    INITIALISED
        .set(())
        .map_err(|_| TelemetryError::AlreadyInitialised)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| TelemetryError::Subscriber(err.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("tracing subscriber already initialised")]
    AlreadyInitialised,
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
