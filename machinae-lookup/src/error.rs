//! Error types for the machinae-lookup crate.
//!
//! These errors describe failures *inside* a single source lookup or in
//! building the registry. The task runner converts every one of them into
//! data (an [`ErrorResult`](crate::types::ErrorResult)) so they never abort
//! a run. Messages are stable and never contain credential values.

/// Errors that can occur while building or running a source lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Invalid registry entry or lookup configuration.
    #[error("config error: {0}")]
    Config(String),

    /// An HTTP request to a source failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Failed to parse a source response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Any other failure raised by source code.
    #[error("source error: {0}")]
    Source(String),
}

/// Convenience type alias for machinae-lookup results.
pub type Result<T> = std::result::Result<T, LookupError>;
