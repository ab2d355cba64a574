//! `webscraper` source kind: fetch a page and pull values out with regexes.
//!
//! Each `results` entry is a regex plus a label. Every match yields one
//! finding: the first capture group when the pattern has groups, otherwise
//! the whole match.

use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::LookupError;
use crate::source::{FindingStream, Source};
use crate::types::RawFinding;

use super::request::HttpLookup;

#[derive(Debug, Deserialize)]
struct PatternConfig {
    regex: String,
    pretty_name: Option<String>,
}

/// A compiled extraction pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    pretty_name: Option<String>,
}

impl Pattern {
    /// Compile `regex`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Config`] for an invalid pattern.
    pub fn new(regex: &str, pretty_name: Option<String>) -> Result<Self, LookupError> {
        let regex = Regex::new(regex)
            .map_err(|e| LookupError::Config(format!("invalid regex {regex:?}: {e}")))?;
        Ok(Self { regex, pretty_name })
    }
}

/// Regex-over-HTML source.
#[derive(Debug)]
pub struct WebscraperSource {
    http: HttpLookup,
    patterns: Vec<Pattern>,
}

impl WebscraperSource {
    /// Build from the site's `webscraper` kind table, compiling every pattern.
    pub fn new(http: HttpLookup, kind: &Map<String, Value>) -> Result<Self, LookupError> {
        let configs: Vec<PatternConfig> = match kind.get("results") {
            Some(results) => serde_json::from_value(results.clone()).map_err(|e| {
                LookupError::Config(format!("site {}: invalid results: {e}", http.site()))
            })?,
            None => Vec::new(),
        };
        let patterns = configs
            .into_iter()
            .map(|c| Pattern::new(&c.regex, c.pretty_name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { http, patterns })
    }
}

impl Source for WebscraperSource {
    fn run(&mut self) -> FindingStream<'_> {
        async_stream::stream! {
            let body = match self.http.fetch().await {
                Ok(body) => body,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            for finding in scrape(&body, &self.patterns) {
                yield Ok(finding);
            }
        }
        .boxed()
    }
}

/// Run every pattern over `body`, in declaration order.
pub fn scrape(body: &str, patterns: &[Pattern]) -> Vec<RawFinding> {
    let mut findings = Vec::new();
    for pattern in patterns {
        let has_groups = pattern.regex.captures_len() > 1;
        for captures in pattern.regex.captures_iter(body) {
            let matched = if has_groups {
                captures.get(1)
            } else {
                captures.get(0)
            };
            let Some(matched) = matched else { continue };
            let value = matched.as_str().trim();
            if value.is_empty() {
                continue;
            }
            findings.push(RawFinding::Named {
                value: value.to_owned(),
                pretty_name: pattern.pretty_name.clone(),
            });
        }
    }
    findings
}
