//! Tracing initialization for the runner binary.

/// Initialize the global subscriber with `RUST_LOG`-style filtering,
/// defaulting to `info`.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
