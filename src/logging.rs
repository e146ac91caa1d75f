//! Tracing setup.
//!
//! Logs go to stderr so stdout stays clean for tool output. The filter is
//! read from `RELAY_LOG` (e.g. `RELAY_LOG=content_relay=debug`) and
//! defaults to `info`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_ENV: &str = "RELAY_LOG";

pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr);
    // A second init (tests, embedding binaries) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
