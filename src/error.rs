//! Error types for the machinae front end.

use machinae_lookup::LookupError;

/// Top-level error type for configuration, targets and output.
#[derive(Debug, thiserror::Error)]
pub enum MachinaeError {
    /// Configuration file could not be parsed or is malformed.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the lookup engine.
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Results could not be rendered.
    #[error("output error: {0}")]
    Output(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MachinaeError>;
