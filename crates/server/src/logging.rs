use tracing_subscriber::{fmt, EnvFilter};

/// Structured logging, `RUST_LOG`-driven like the rest of the stack. Falls
/// back to `info` when the environment variable is unset or unparsable.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}
