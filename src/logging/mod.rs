
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: `default_level` for this crate, warnings elsewhere
#[inline]
pub fn default_filter(default_level: &str) -> String {
    format!("warn,insight_rag={}", default_level.to_ascii_lowercase())
}

/// Install the global fmt subscriber. Logs go to stderr so command output stays clean.
#[inline]
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(default_level)));

    // A subscriber may already be installed (e.g. by an embedding application).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
