//! Tracing setup for the binary.
//!
//! Diagnostics go to stderr so command output on stdout stays clean.
//! `RUST_LOG` overrides the default filter.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "warn,casebook=debug,casebook_core=debug"
    } else {
        "warn,casebook=info,casebook_core=info"
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // a second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
