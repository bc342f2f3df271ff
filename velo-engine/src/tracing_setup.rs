//! Tracing initialization for hosts that do not install their own
//! subscriber.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber: env-filterable, compact output, `info`
/// by default. Calling it again is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
