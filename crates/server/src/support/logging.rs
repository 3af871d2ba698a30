#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

pub(crate) const LOG_ENV: &str = "GRIDLOAD_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global subscriber. Logs go to stderr; stdout carries
/// protocol frames only.
pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true)
        .try_init()
        .ok();
}
