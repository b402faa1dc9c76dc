//! Tracing/logging initialization.
//!
//! JSON lines to stdout, filtered via `RUST_LOG`. The default keeps the
//! reconciliation services at debug so per-row skip decisions (cap reached,
//! duplicate month) stay visible during imports.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,refpay_reconcile=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
