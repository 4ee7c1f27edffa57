//! Logger setup for the binary.

use env_logger::{Builder, Env};

/// Installs the global logger. `RUST_LOG` overrides the default `info` filter.
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
