//! logging
//!
//! `tracing` subscriber setup for the binary.
//!
//! Log output goes to stderr and is separate from user-facing
//! notifications, which `ui::output` renders on stdout. `RUST_LOG` wins over
//! the flag-derived default.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::ui::output::Verbosity;

/// Default filter directive for a verbosity.
pub fn default_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Debug => "reposync=debug,warn",
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity == Verbosity::Debug)
        .with_level(true)
        .with_filter(filter);

    let _ = tracing_subscriber::registry().with(console).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_parse() {
        for verbosity in [Verbosity::Quiet, Verbosity::Normal, Verbosity::Debug] {
            assert!(EnvFilter::try_new(default_directive(verbosity)).is_ok());
        }
    }
}
