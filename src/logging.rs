use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "statement_merge=info";

/// Console logging on stderr, filtered by `RUST_LOG`. Stdout is left to the
/// final confirmation line.
pub(crate) fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
