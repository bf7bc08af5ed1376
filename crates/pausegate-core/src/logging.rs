//! Logging setup.
//!
//! Library code only emits `tracing` events; binaries decide where they go.
//! Output goes to stderr so stdout stays free for JSON.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::storage::LoggingConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level. Calling this twice is a
/// no-op for the second call.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(level = %config.level, "Logging initialized");
    }
}

/// Initialize logging for tests.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
