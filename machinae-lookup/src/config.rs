//! Lookup configuration with sensible defaults.
//!
//! [`LookupConfig`] holds the knobs the orchestrator needs per run: the
//! per-source deadline, the optional pre-lookup delay, the worker ceiling and
//! the verbosity flag handed through to sources.

use crate::error::LookupError;
use std::time::Duration;

/// Configuration for a lookup run.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    /// Hard deadline for one source lookup, in seconds.
    pub timeout_seconds: u64,
    /// Pause before each individual lookup, in seconds. Each task sleeps
    /// independently, so delays of parallel tasks overlap.
    pub delay_seconds: u64,
    /// Ceiling on concurrent lookups per target.
    pub max_workers: usize,
    /// Passed through to every source.
    pub verbose: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 15,
            delay_seconds: 0,
            max_workers: 10,
            verbose: true,
        }
    }
}

impl LookupConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_workers` must be greater than 0
    /// - `timeout_seconds` must be greater than 0
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.max_workers == 0 {
            return Err(LookupError::Config(
                "max_workers must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(LookupError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// The per-source deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// The per-task pre-delay.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// Pool size for a wave of `applicable` sources: never more workers than
    /// work, never more than the configured ceiling.
    pub fn pool_size(&self, applicable: usize) -> usize {
        self.max_workers.min(applicable)
    }
}
