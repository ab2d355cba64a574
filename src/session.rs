//! Wiring a loaded configuration into a ready orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use machinae_lookup::{LookupConfig, Orchestrator, SiteFactory, SiteSelection};

use crate::config::SitesConfig;
use crate::error::Result;
use crate::{credentials, proxy};

/// Run-time knobs taken from the command line.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Which sites take part.
    pub sites: SiteSelection,
    /// Lookup timeouts, delay, pool size and verbosity.
    pub lookup: LookupConfig,
    /// Credentials file (`--auth`).
    pub auth: Option<PathBuf>,
    /// Explicit proxy for both schemes (`--http-proxy`).
    pub http_proxy: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sites: SiteSelection::Default,
            lookup: LookupConfig::default(),
            auth: None,
            http_proxy: None,
        }
    }
}

/// Build the orchestrator for `config` with the selected sites, credentials
/// and proxies.
///
/// # Errors
///
/// Returns an error if the sites are malformed, the credentials file cannot
/// be read, or the lookup settings are invalid.
pub fn orchestrator(config: &SitesConfig, options: &SessionOptions) -> Result<Orchestrator> {
    let registry = config.registry(&options.sites)?;
    let credentials = credentials::load(options.auth.as_deref())?;
    let proxies = proxy::resolve(options.http_proxy.as_deref());

    tracing::debug!(
        sites = registry.len(),
        workers = options.lookup.max_workers,
        timeout_secs = options.lookup.timeout_seconds,
        "session ready"
    );

    let factory = Arc::new(SiteFactory::new(options.lookup.timeout()));
    let orchestrator = Orchestrator::new(registry, factory, options.lookup.clone())?
        .with_credentials(credentials)
        .with_proxies(proxies);
    Ok(orchestrator)
}
