//! Tracing subscriber setup for binaries embedding the engine.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=almacen_db=trace` - Trace the repositories only
//! - Default: `info,almacen=debug,sqlx=warn`

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,almacen=debug,sqlx=warn";

/// Installs a formatted subscriber filtered by `RUST_LOG`.
///
/// Calling it again once a subscriber is installed does nothing.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
