//! Shared tracing/logging initialization.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber for a certdesk binary.
///
/// `RUST_LOG` wins over `default_filter` when it parses. With `log_json`
/// every event is one JSON line carrying its span fields (such as
/// `certificate_id`), otherwise the human-readable format is used.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str, log_json: bool) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let (json, plain) = if log_json {
        (Some(fmt::layer().json().with_current_span(true)), None)
    } else {
        (None, Some(fmt::layer().with_target(false)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .try_init()
        .is_ok()
}

/// Build the default filter string for a crate at the given level.
///
/// Crate names use hyphens on the command line but underscores as tracing
/// targets, so `certdesk-daemon` becomes `certdesk_daemon=<level>`.
pub fn default_filter(crate_name: &str, level: &str) -> String {
    format!("{}={level}", crate_name.replace('-', "_"))
}
