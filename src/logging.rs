//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "warn";

/// Installs a formatting subscriber filtered by `RUST_LOG`.
///
/// Warnings and errors are shown when `RUST_LOG` is unset or invalid.
/// Output goes through the test writer so it is captured per test. Calling
/// this more than once is harmless.
pub fn init() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(directives.as_deref()))
        .with_test_writer()
        .try_init();
}

fn filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}
