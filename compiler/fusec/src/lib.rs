//! Driver for the add-fusion autovectorizer.
//!
//! Plays the part of a pass manager: reads a module in the textual IR,
//! runs the pass once per function and prints the result. The binary in
//! `main.rs` is a thin wrapper over [`compile_file`].

mod driver;
mod options;

use std::sync::Once;

pub use driver::{compile_file, process_source, render_report, DriverError, Output};
pub use options::{parse_options, CliOptions};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=fuse_vec=debug`, or `RUST_LOG=fuse_vec=trace` to
/// also dump every function before and after the pass.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .init();
        }
    });
}
