//! # machinae-lookup
//!
//! Fan one target out to every applicable intelligence source, concurrently,
//! and get back a single record whose order never depends on which source
//! answered first.
//!
//! ## Design
//!
//! - A [`Registry`] lists sources in declaration order; that order is the
//!   output order
//! - Per target, one task per applicable source runs in a pool of
//!   `min(max_workers, applicable)` slots that lives only for that target
//! - Each task gets its own deep copy of the source descriptor and a hard
//!   deadline; timeouts, errors and panics come back as [`ErrorResult`]s
//! - Completions are tagged with their registry position and sorted back
//!   into place before the [`ResultSet`] is emitted
//!
//! ## Security
//!
//! - Credentials are shared read-only and never appear in logs or errors
//! - Request URLs are logged at info level only when `verbose` is set
//!
//! ## Example
//!
//! ```no_run
//! # async fn example() -> machinae_lookup::Result<()> {
//! use std::sync::Arc;
//! use machinae_lookup::{LookupConfig, Orchestrator, Registry, SiteFactory, TargetInfo};
//!
//! let config = LookupConfig::default();
//! let factory = Arc::new(SiteFactory::new(config.timeout()));
//! let orchestrator = Orchestrator::new(Registry::default(), factory, config)?;
//! let set = orchestrator
//!     .lookup(TargetInfo::new("8.8.8.8", "ipv4", true))
//!     .await;
//! for entry in &set.entries {
//!     println!("{}", entry.name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod registry;
pub mod runner;
pub mod source;
pub mod sources;
pub mod types;

pub use config::LookupConfig;
pub use error::{LookupError, Result};
pub use orchestrator::Orchestrator;
pub use registry::{Registry, SiteSelection};
pub use runner::{run_task, TaskContext, TaskOutcome};
pub use source::{Credentials, FindingStream, ProxyConfig, Source, SourceFactory};
pub use sources::SiteFactory;
pub use types::{
    ErrorKind, ErrorResult, Finding, RawFinding, ResultSet, SiteOutcome, SiteResults,
    SourceDescriptor, TargetInfo,
};
