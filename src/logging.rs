use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}

/// Diagnostics go to stderr, filtered by `RUST_LOG` and quiet below warn by
/// default, so stdout carries only the tool's own output.
pub fn init() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(filter(&directives))
        .with_writer(std::io::stderr)
        .init();
}
