//! Observability subsystem
//!
//! Structured logging through `tracing`. Subsystems emit events with the
//! `event` field set to an [`Event`]; the binary installs a formatting
//! subscriber once at startup.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never changes the outcome of an operation
//! 3. A library caller that installs no subscriber pays only for disabled
//!    callsites

mod events;

pub use events::Event;

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level`. An already installed
/// subscriber is left in place, so calling this twice is harmless.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
