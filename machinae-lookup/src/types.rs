//! Core data model: targets, source descriptors, findings and per-target result sets.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// The value under investigation plus its type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    /// The raw target (address, domain, hash, ...).
    pub target: String,
    /// The target type tag, e.g. `ipv4` or `fqdn`.
    pub otype: String,
    /// `true` when the otype was detected, `false` when it was forced by the caller.
    pub otype_detected: bool,
}

impl TargetInfo {
    /// Create a new target triple.
    pub fn new(target: impl Into<String>, otype: impl Into<String>, otype_detected: bool) -> Self {
        Self {
            target: target.into(),
            otype: otype.into(),
            otype_detected,
        }
    }
}

/// A configured source: its registry name, the otypes it supports and its
/// source-specific configuration.
///
/// Cloning a descriptor is a deep copy; the task runner relies on this to
/// give each task exclusive ownership of the config it mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Registry key. Unique within a registry.
    pub name: String,
    /// Human-readable name used by formatters, if configured.
    pub label: Option<String>,
    /// Supported target types, lowercased.
    pub otypes: BTreeSet<String>,
    /// Opaque source configuration, in declaration order.
    pub config: Map<String, Value>,
}

impl SourceDescriptor {
    /// Create a descriptor, lowercasing every otype.
    pub fn new<I, S>(name: impl Into<String>, otypes: I, config: Map<String, Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            label: None,
            otypes: otypes
                .into_iter()
                .map(|o| o.as_ref().to_lowercase())
                .collect(),
            config,
        }
    }

    /// Attach a display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether this source applies to `otype` (case-insensitive).
    ///
    /// A descriptor without otypes applies to nothing.
    pub fn supports(&self, otype: &str) -> bool {
        let otype = otype.to_lowercase();
        self.otypes.contains(&otype)
    }

    /// The label if one is configured, otherwise the registry name.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A finding exactly as a source yields it, before normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFinding {
    /// A bare value with no label.
    Value(String),
    /// A value with the name it should be displayed under.
    Named {
        /// The finding itself.
        value: String,
        /// Display name for the finding.
        pretty_name: Option<String>,
    },
}

impl From<String> for RawFinding {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for RawFinding {
    fn from(value: &str) -> Self {
        Self::Value(value.to_owned())
    }
}

/// One atomic finding from a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// The value found.
    pub value: String,
    /// Display name for the value, if the source provides one.
    pub pretty_name: Option<String>,
}

impl Finding {
    /// Create a finding.
    pub fn new(value: impl Into<String>, pretty_name: Option<String>) -> Self {
        Self {
            value: value.into(),
            pretty_name,
        }
    }
}

impl From<RawFinding> for Finding {
    fn from(raw: RawFinding) -> Self {
        match raw {
            RawFinding::Value(value) => Self::new(value, None),
            RawFinding::Named { value, pretty_name } => Self::new(value, pretty_name),
        }
    }
}

/// Successful outcome of one source lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteResults {
    /// The descriptor copy the task ran with.
    pub descriptor: SourceDescriptor,
    /// Findings in the order the source produced them.
    pub results: Vec<Finding>,
}

/// Why a source lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The lookup did not finish before its deadline.
    Timeout,
    /// Any other failure while constructing or draining the source.
    SourceFault(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("Timeout"),
            Self::SourceFault(message) => f.write_str(message),
        }
    }
}

/// Failed outcome of one source lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResult {
    /// The target the lookup ran for.
    pub target_info: TargetInfo,
    /// The descriptor of the failing source.
    pub descriptor: SourceDescriptor,
    /// What went wrong.
    pub error: ErrorKind,
}

/// The outcome of one source for one target: success or failure, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SiteOutcome {
    /// The source completed.
    Results(SiteResults),
    /// The source timed out or faulted.
    Error(ErrorResult),
}

impl SiteOutcome {
    /// The descriptor this outcome belongs to.
    pub fn descriptor(&self) -> &SourceDescriptor {
        match self {
            Self::Results(site) => &site.descriptor,
            Self::Error(error) => &error.descriptor,
        }
    }

    /// Registry name of the source.
    pub fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Whether this outcome is a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl From<SiteResults> for SiteOutcome {
    fn from(site: SiteResults) -> Self {
        Self::Results(site)
    }
}

impl From<ErrorResult> for SiteOutcome {
    fn from(error: ErrorResult) -> Self {
        Self::Error(error)
    }
}

/// All source outcomes for one target, in registry order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    /// The target these entries describe.
    pub target_info: TargetInfo,
    /// One entry per applicable source, in registry order.
    pub entries: Vec<SiteOutcome>,
}

impl ResultSet {
    /// Build a result set.
    pub fn new(target_info: TargetInfo, entries: Vec<SiteOutcome>) -> Self {
        Self {
            target_info,
            entries,
        }
    }

    /// Registry names of the entries, in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(SiteOutcome::name).collect()
    }
}
