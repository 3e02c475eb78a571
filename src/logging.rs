//! Log output of the command line tool.
//!
//! Events go to stderr so they never mix with the values printed on stdout. The level is taken
//! from `RUST_LOG` and defaults to warnings.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

pub fn init(debug: bool) {
    let default = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let mut env_filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();
    if debug {
        env_filter = env_filter.add_directive(LevelFilter::DEBUG.into());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();
}
