//! # machinae
//!
//! Security intelligence collector. Give it indicators (IP addresses,
//! domains, URLs, hashes, email addresses, MAC addresses, certificate
//! fingerprints) and it asks every configured site about each one at the same
//! time, then prints one record per indicator.
//!
//! The lookup engine lives in [`machinae_lookup`]; this crate adds the sites
//! file, target detection, credentials, proxies, output formats and the
//! command line.
//!
//! ## Pipeline
//!
//! 1. [`config::SitesConfig::load`] discovers and merges the sites file
//! 2. [`session::orchestrator`] turns the selected sites into an
//!    [`machinae_lookup::Orchestrator`]
//! 3. [`target::collect`] reads targets and detects their otypes
//! 4. [`output::write_stream`] renders each record as it completes

pub mod config;
pub mod credentials;
pub mod error;
pub mod output;
pub mod proxy;
pub mod session;
pub mod target;
pub mod web;

pub use config::{ConfigPaths, LoadOptions, SitesConfig};
pub use error::{MachinaeError, Result};
pub use output::Format;
pub use session::SessionOptions;
