//! Tracing subscriber setup for embedders and examples.

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a fmt subscriber with env-filter control and span-aware error
/// context. Honors `RUST_LOG`; defaults to `info` for this crate. Calling it
/// twice is harmless: a second install attempt is ignored.
pub fn init_tracing() {
    let fmt_layer = fmt::layer().with_target(false);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,converge=info"))
        .unwrap_or_default();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .ok();
}
