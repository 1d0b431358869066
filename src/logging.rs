use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,devotional_lib=info";

/// Installs the global `fmt` subscriber. `RUST_LOG` overrides the default
/// filter. Safe to call more than once.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
