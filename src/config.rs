//! Sites configuration: discovery, overlay merging and registry conversion.
//!
//! The sites file is TOML whose top-level tables are sites, in declaration
//! order. A base file is discovered from a fixed list of locations, then
//! system and user overlays are deep-merged on top unless merging is turned
//! off.

use std::path::{Path, PathBuf};

use machinae_lookup::{Registry, SiteSelection};
use toml::{Table, Value};

use crate::error::{MachinaeError, Result};

/// Environment variable naming an extra base config location.
pub const CONFIG_ENV: &str = "MACHINAE_CONFIG";

/// System-wide overlay merged over the base file.
pub const SYSTEM_OVERLAY: &str = "/etc/machinae.local.toml";

/// Per-user overlay, relative to the home directory.
pub const USER_OVERLAY: &str = ".machinae.toml";

/// Where to look for the base file and which overlays to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Base file candidates; the first that exists wins.
    pub candidates: Vec<PathBuf>,
    /// Overlays merged in order when they exist.
    pub overlays: Vec<PathBuf>,
}

impl ConfigPaths {
    /// The standard locations: `machinae.toml`, `/etc/machinae.toml` and
    /// `$MACHINAE_CONFIG`, with `/etc/machinae.local.toml` and
    /// `~/.machinae.toml` as overlays.
    pub fn standard() -> Self {
        let mut candidates = vec![
            PathBuf::from("machinae.toml"),
            PathBuf::from("/etc/machinae.toml"),
        ];
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            candidates.push(expand_home(Path::new(&path)));
        }

        let mut overlays = vec![PathBuf::from(SYSTEM_OVERLAY)];
        if let Some(home) = dirs::home_dir() {
            overlays.push(home.join(USER_OVERLAY));
        }

        Self {
            candidates,
            overlays,
        }
    }

    /// First candidate that exists on disk.
    pub fn discover(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.is_file())
    }
}

/// Options controlling [`SitesConfig::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit base file; skips discovery.
    pub path: Option<PathBuf>,
    /// Skip the overlays.
    pub nomerge: bool,
}

/// The merged sites document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitesConfig {
    sites: Table,
}

impl SitesConfig {
    /// Parse a sites document.
    ///
    /// # Errors
    ///
    /// Returns [`MachinaeError::Config`] for invalid TOML.
    pub fn parse(content: &str) -> Result<Self> {
        let sites: Table = toml::from_str(content).map_err(|e| MachinaeError::Config(e.to_string()))?;
        Ok(Self { sites })
    }

    /// Load a sites document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let sites: Table = toml::from_str(&content)
            .map_err(|e| MachinaeError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self { sites })
    }

    /// Load the base file and apply overlays.
    ///
    /// An explicit path must exist. Without one, a missing base file leaves
    /// the configuration empty and logs a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if any file that exists cannot be read or parsed.
    pub fn load(options: &LoadOptions, paths: &ConfigPaths) -> Result<Self> {
        let base = match options.path.as_deref() {
            Some(path) => Some(path),
            None => paths.discover(),
        };

        let mut config = match base {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading sites config");
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        if !options.nomerge {
            for overlay in paths.overlays.iter().filter(|p| p.is_file()) {
                tracing::debug!(path = %overlay.display(), "merging config overlay");
                config.merge(Self::from_file(overlay)?);
            }
        }

        if config.is_empty() {
            tracing::warn!(
                "operating without a config file; place a sites file at machinae.toml, \
                 /etc/machinae.toml or ~/.machinae.toml"
            );
        }
        Ok(config)
    }

    /// Deep-merge `overlay` on top of this document.
    ///
    /// Tables merge key by key; any other value replaces. New keys append.
    pub fn merge(&mut self, overlay: SitesConfig) {
        merge_tables(&mut self.sites, overlay.sites);
    }

    /// Whether no sites are configured.
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Number of configured sites.
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// Site names in declaration order.
    pub fn site_names(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    /// The raw table of one site.
    pub fn site(&self, name: &str) -> Option<&Table> {
        self.sites.get(name).and_then(Value::as_table)
    }

    /// Convert the selected sites into a lookup registry, file order kept.
    ///
    /// # Errors
    ///
    /// Returns an error if a site is not a table or has malformed `otypes`.
    pub fn registry(&self, selection: &SiteSelection) -> Result<Registry> {
        let serde_json::Value::Object(map) = serde_json::to_value(&self.sites)
            .map_err(|e| MachinaeError::Config(e.to_string()))?
        else {
            return Err(MachinaeError::Config("sites document is not a table".into()));
        };
        let registry = Registry::from_map(&map)?;
        Ok(registry.select(selection))
    }

    /// The merged document as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`MachinaeError::Output`] if serialization fails.
    pub fn dump(&self) -> Result<String> {
        toml::to_string_pretty(&self.sites).map_err(|e| MachinaeError::Output(e.to_string()))
    }

    /// One line per site: key, display name, otypes and whether it runs by
    /// default.
    pub fn list_sites(&self) -> String {
        let mut out = String::new();
        for (key, site) in &self.sites {
            let Some(site) = site.as_table() else { continue };
            let label = site.get("name").and_then(Value::as_str).unwrap_or(key);
            let otypes: Vec<&str> = site
                .get("otypes")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let default = site.get("default").and_then(Value::as_bool).unwrap_or(true);
            out.push_str(&format!(
                "{key:<24} {label:<32} [{}]{}\n",
                otypes.join(", "),
                if default { "" } else { " (not default)" }
            ));
        }
        out
    }
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
