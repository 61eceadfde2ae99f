//! Error types for the fixture runner.

use thiserror::Error;

/// Top-level error type for fixture runner operations.
///
/// Test failures raised inside a running test never surface here; they
/// travel through the host runner's abort mechanism instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error while loading configuration or starting the harness.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A summary could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A harness run finished with failing tests.
    #[error("{failed} of {total} tests failed\n{report}")]
    TestsFailed {
        failed: usize,
        total: usize,
        report: String,
    },
}

/// Result type alias for fixture runner operations.
pub type Result<T> = std::result::Result<T, Error>;
