//! Tracing subscriber bootstrap.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "grocerymate_e2e=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Safe to call from every test; only the
/// first call takes effect.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer().with_target(false))
        .with(filter())
        .try_init();
}

/// Install a stderr subscriber for command-line use. `RUST_LOG` still wins
/// over `directive`.
pub fn init_with(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

/// Install a JSON-lines subscriber for CI log collection
pub fn init_json() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().json().with_current_span(false))
        .with(filter())
        .try_init();
}
