//! Built-in source kinds.
//!
//! Each module provides a struct implementing [`crate::source::Source`] over
//! HTTP. [`SiteFactory`] picks the kind from the site table: a site carries
//! exactly one kind table (`json` or `webscraper`) next to its `otypes`.

pub mod json;
pub mod request;
pub mod webscraper;

pub use json::JsonSource;
pub use request::{HttpLookup, RequestSpec};
pub use webscraper::WebscraperSource;

use std::time::Duration;

use serde_json::Value;

use crate::error::LookupError;
use crate::source::{Credentials, ProxyConfig, Source, SourceFactory};
use crate::types::SourceDescriptor;

/// Kind tables understood by [`SiteFactory`], in lookup order.
pub const KINDS: &[&str] = &["json", "webscraper"];

/// Builds the built-in HTTP sources from site descriptors.
#[derive(Debug, Clone)]
pub struct SiteFactory {
    timeout: Duration,
}

impl SiteFactory {
    /// A factory whose HTTP clients give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl SourceFactory for SiteFactory {
    fn build(
        &self,
        descriptor: &SourceDescriptor,
        credentials: &Credentials,
        proxies: &ProxyConfig,
    ) -> Result<Box<dyn Source>, LookupError> {
        let config = &descriptor.config;
        let site = descriptor.name.as_str();

        let Some(target) = config.get("target").and_then(Value::as_str) else {
            return Err(LookupError::Config(format!("site {site}: no target injected")));
        };
        let verbose = config.get("verbose").and_then(Value::as_bool).unwrap_or(false);

        let Some((kind, table)) = KINDS
            .iter()
            .find_map(|kind| config.get(*kind).map(|table| (*kind, table)))
        else {
            return Err(LookupError::Source(format!(
                "site {site} has no supported kind (expected one of: {})",
                KINDS.join(", ")
            )));
        };
        let Some(table) = table.as_object() else {
            return Err(LookupError::Config(format!("site {site}: {kind} must be a table")));
        };

        let request = RequestSpec::from_kind(site, table)?;
        let http = HttpLookup::new(site, target, verbose, request, credentials, proxies, self.timeout)?;

        match kind {
            "json" => Ok(Box::new(JsonSource::new(http, table)?)),
            "webscraper" => Ok(Box::new(WebscraperSource::new(http, table)?)),
            other => Err(LookupError::Source(format!("unsupported site kind: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn descriptor(name: &str, config: Value) -> SourceDescriptor {
        let Value::Object(mut map) = config else {
            unreachable!("literal is an object");
        };
        map.insert("target".into(), json!("1.2.3.4"));
        map.insert("verbose".into(), json!(false));
        SourceDescriptor::new(name, ["ipv4"], map)
    }

    fn build(desc: &SourceDescriptor) -> Result<Box<dyn Source>, LookupError> {
        SiteFactory::new(Duration::from_secs(5)).build(
            desc,
            &Credentials::default(),
            &ProxyConfig::default(),
        )
    }

    #[test]
    fn builds_json_kind() {
        let desc = descriptor(
            "ipinfo",
            json!({ "json": { "request": { "url": "https://ipinfo.io/{target}/json" },
                              "results": [{ "key": "org", "pretty_name": "Org" }] } }),
        );
        assert!(build(&desc).is_ok());
    }

    #[test]
    fn builds_webscraper_kind() {
        let desc = descriptor(
            "ipvoid",
            json!({ "webscraper": { "request": { "url": "https://ipvoid.test/{target}" },
                                    "results": [{ "regex": "Ratio: (\\d+)", "pretty_name": "Ratio" }] } }),
        );
        assert!(build(&desc).is_ok());
    }

    #[test]
    fn missing_kind_is_source_error() {
        let desc = descriptor("mystery", json!({ "otypes": ["ipv4"] }));
        let err = build(&desc).err().expect("should fail");
        assert!(err.to_string().contains("no supported kind"));
    }

    #[test]
    fn missing_target_is_config_error() {
        let desc = SourceDescriptor::new("x", ["ipv4"], Map::new());
        let err = build(&desc).err().expect("should fail");
        assert!(err.to_string().contains("no target"));
    }

    #[test]
    fn invalid_regex_fails_construction() {
        let desc = descriptor(
            "broken",
            json!({ "webscraper": { "request": { "url": "https://x.test/{target}" },
                                    "results": [{ "regex": "(" }] } }),
        );
        let err = build(&desc).err().expect("should fail");
        assert!(err.to_string().contains("invalid regex"));
    }

    #[test]
    fn missing_auth_entry_fails_construction() {
        let desc = descriptor(
            "shodan",
            json!({ "json": { "request": { "url": "https://x.test/{target}", "auth": "shodan" } } }),
        );
        let err = build(&desc).err().expect("should fail");
        assert!(err.to_string().contains("no credentials entry"));
    }

    #[test]
    fn factory_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SiteFactory>();
    }
}
