//! The ordered catalog of configured sources.
//!
//! Declaration order is the output order, so the registry is a plain ordered
//! list with unique names rather than a map.

use std::collections::HashSet;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::LookupError;
use crate::types::SourceDescriptor;

/// Ordered, name-unique list of source descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    sources: Vec<SourceDescriptor>,
}

impl Registry {
    /// Build a registry, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Config`] if two descriptors share a name.
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, LookupError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.name.as_str()) {
                return Err(LookupError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
        }
        Ok(Self { sources })
    }

    /// Build a registry from an ordered `name → site table` map.
    ///
    /// Each site's `otypes` must be an array of strings (absent means the
    /// site applies to nothing). A string `name` key becomes the display
    /// label. Everything else stays in the opaque config.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Config`] if a site is not a table or its
    /// `otypes` is malformed.
    pub fn from_map(sites: &Map<String, Value>) -> Result<Self, LookupError> {
        let mut sources = Vec::with_capacity(sites.len());
        for (name, site) in sites {
            let Some(config) = site.as_object() else {
                return Err(LookupError::Config(format!("site {name} must be a table")));
            };
            let otypes = parse_otypes(name, config.get("otypes"))?;
            let mut descriptor = SourceDescriptor::new(name.clone(), otypes, config.clone());
            if let Some(label) = config.get("name").and_then(Value::as_str) {
                descriptor = descriptor.with_label(label);
            }
            sources.push(descriptor);
        }
        Ok(Self { sources })
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the registry has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All sources in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    /// Look up one source by name.
    pub fn get(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Sources supporting `otype`, in declaration order.
    pub fn applicable<'a>(&'a self, otype: &'a str) -> impl Iterator<Item = &'a SourceDescriptor> {
        self.sources.iter().filter(move |s| s.supports(otype))
    }

    /// A new registry holding only the selected sources, order preserved.
    pub fn select(&self, selection: &SiteSelection) -> Self {
        let sources = self
            .sources
            .iter()
            .filter(|s| selection.includes(s))
            .cloned()
            .collect();
        Self { sources }
    }
}

fn parse_otypes(site: &str, otypes: Option<&Value>) -> Result<Vec<String>, LookupError> {
    let Some(otypes) = otypes else {
        return Ok(Vec::new());
    };
    let Some(items) = otypes.as_array() else {
        return Err(LookupError::Config(format!(
            "site {site}: otypes must be an array of strings"
        )));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_owned).ok_or_else(|| {
                LookupError::Config(format!("site {site}: otypes must be an array of strings"))
            })
        })
        .collect()
}

/// Which configured sites a run uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SiteSelection {
    /// Every site whose `default` key is not `false`.
    #[default]
    Default,
    /// Every configured site.
    All,
    /// Only the named sites (lowercased).
    Named(Vec<String>),
}

impl SiteSelection {
    /// Whether `source` is part of this selection.
    pub fn includes(&self, source: &SourceDescriptor) -> bool {
        match self {
            Self::Default => source
                .config
                .get("default")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            Self::All => true,
            Self::Named(names) => {
                let name = source.name.to_lowercase();
                names.iter().any(|n| *n == name)
            }
        }
    }
}

impl FromStr for SiteSelection {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "default" => Ok(Self::Default),
            "all" => Ok(Self::All),
            "" => Err(LookupError::Config("site selection must not be empty".into())),
            list => Ok(Self::Named(
                list.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_owned)
                    .collect(),
            )),
        }
    }
}
