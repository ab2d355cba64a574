//! Trait definitions for pluggable source backends.
//!
//! A [`SourceFactory`] turns a descriptor plus the shared runtime parameters
//! (credentials, proxies) into a runnable [`Source`]; a source yields a lazy,
//! finite [`FindingStream`] for the target injected into its descriptor.
//! The task runner owns both halves and maps every failure to data.

use crate::error::LookupError;
use crate::types::{RawFinding, SourceDescriptor};
use futures::stream::BoxStream;
use serde_json::{Map, Value};

/// Lazy, finite sequence of findings produced by one source run.
///
/// An `Err` item is a fault; the runner stops draining at the first one.
pub type FindingStream<'a> = BoxStream<'a, Result<RawFinding, LookupError>>;

/// A runnable lookup for one target.
///
/// Implementations must be cooperative: all waiting has to happen at
/// `.await` points, otherwise the per-lookup deadline cannot fire.
pub trait Source: Send {
    /// Start the lookup and return its findings.
    ///
    /// The stream is pulled to completion exactly once.
    fn run(&mut self) -> FindingStream<'_>;
}

/// Builds [`Source`] values from descriptors.
///
/// All implementations must be `Send + Sync`; one factory is shared by every
/// concurrent task of a wave.
pub trait SourceFactory: Send + Sync {
    /// Construct the source described by `descriptor`.
    ///
    /// `descriptor.config` already carries the injected `target`, `verbose`
    /// and `name` keys.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the descriptor cannot be turned into a
    /// runnable source.
    fn build(
        &self,
        descriptor: &SourceDescriptor,
        credentials: &Credentials,
        proxies: &ProxyConfig,
    ) -> Result<Box<dyn Source>, LookupError>;
}

impl<F> SourceFactory for F
where
    F: Fn(&SourceDescriptor, &Credentials, &ProxyConfig) -> Result<Box<dyn Source>, LookupError>
        + Send
        + Sync,
{
    fn build(
        &self,
        descriptor: &SourceDescriptor,
        credentials: &Credentials,
        proxies: &ProxyConfig,
    ) -> Result<Box<dyn Source>, LookupError> {
        self(descriptor, credentials, proxies)
    }
}

/// Named credential entries, shared read-only by every task.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    entries: Map<String, Value>,
}

impl Credentials {
    /// Wrap a map of credential entries.
    pub fn new(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Look up one entry by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Whether no credentials are loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// HTTP proxy settings, shared read-only by every task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy for plain HTTP requests.
    pub http: Option<String>,
    /// Proxy for HTTPS requests.
    pub https: Option<String>,
}

impl ProxyConfig {
    /// The same proxy for both schemes.
    pub fn both(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            http: Some(url.clone()),
            https: Some(url),
        }
    }

    /// Whether any proxy is configured.
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    /// A mock source yielding a fixed list, then optionally failing.
    struct MockSource {
        values: Vec<&'static str>,
        fail: bool,
    }

    impl Source for MockSource {
        fn run(&mut self) -> FindingStream<'_> {
            let mut items: Vec<Result<RawFinding, LookupError>> =
                self.values.iter().map(|v| Ok(RawFinding::from(*v))).collect();
            if self.fail {
                items.push(Err(LookupError::Source("mock failure".into())));
            }
            futures::stream::iter(items).boxed()
        }
    }

    fn factory(
        descriptor: &SourceDescriptor,
        _credentials: &Credentials,
        _proxies: &ProxyConfig,
    ) -> Result<Box<dyn Source>, LookupError> {
        if descriptor.name == "broken" {
            return Err(LookupError::Config("broken descriptor".into()));
        }
        Ok(Box::new(MockSource {
            values: vec!["a", "b"],
            fail: false,
        }))
    }

    #[test]
    fn mock_source_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MockSource>();
    }

    #[tokio::test]
    async fn closure_factory_builds_sources() {
        let desc = SourceDescriptor::new("ok", ["ipv4"], Map::new());
        let mut source = factory
            .build(&desc, &Credentials::default(), &ProxyConfig::default())
            .expect("should build");
        let values: Vec<_> = source.run().collect().await;
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn closure_factory_propagates_errors() {
        let desc = SourceDescriptor::new("broken", ["ipv4"], Map::new());
        let result = factory.build(&desc, &Credentials::default(), &ProxyConfig::default());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stream_carries_faults() {
        let mut source = MockSource {
            values: vec!["a"],
            fail: true,
        };
        let items: Vec<_> = source.run().collect().await;
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn credentials_lookup() {
        let mut map = Map::new();
        map.insert("shodan".into(), serde_json::json!({"header": "Key", "value": "abc"}));
        let creds = Credentials::new(map);
        assert!(!creds.is_empty());
        assert_eq!(creds.get("shodan").and_then(|v| v["value"].as_str()), Some("abc"));
        assert!(creds.get("missing").is_none());
    }

    #[test]
    fn proxy_both_sets_schemes() {
        let proxies = ProxyConfig::both("http://proxy:3128");
        assert_eq!(proxies.http.as_deref(), Some("http://proxy:3128"));
        assert_eq!(proxies.https.as_deref(), Some("http://proxy:3128"));
        assert!(!proxies.is_empty());
        assert!(ProxyConfig::default().is_empty());
    }
}
