//! Logging setup.
//!
//! Library code logs through [`prelude`]; binaries call
//! [`init_subscriber`] once at startup.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

pub mod prelude {
    pub use ::tracing::{debug, error, info, trace, warn};
}

/// Install a formatting subscriber filtered by `RUST_LOG`, defaulting to
/// `info`.
///
/// Lines carry no timestamp, and colour is only used when stderr is a
/// terminal.
pub fn init_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}
