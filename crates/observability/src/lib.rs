//! Process-wide logging setup shared by billsweep binaries.

pub mod logging;

/// Initialize structured logging.
///
/// `default_level` applies when `RUST_LOG` is unset or unparseable. Safe to
/// call multiple times; subsequent calls are no-ops.
pub fn init(default_level: &str) {
    logging::init(default_level);
}
