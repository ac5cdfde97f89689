use tracing_subscriber::EnvFilter;

/// Initialize structured logging for the process.
///
/// The filter comes from `RUST_LOG` when set, otherwise `info`. Safe to call
/// more than once; later calls are no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok(); // Ignore err on re-init
}
