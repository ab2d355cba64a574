//! Lookup orchestrator: per-target fan-out with stable output order.
//!
//! This module dispatches one task per applicable source for each target,
//! bounds the wave by the configured worker ceiling, and restores registry
//! order over the unordered completions.

pub mod lookup;

pub use lookup::Orchestrator;
