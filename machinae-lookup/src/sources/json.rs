//! `json` source kind: query an HTTP API and pick values out of the JSON body.
//!
//! Each `results` entry names a JSON pointer (`/a/b`, or dotted `a.b`) and
//! the label its values are shown under. Missing keys and nulls yield
//! nothing; arrays are joined unless `multi_match` asks for one finding per
//! element.

use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::LookupError;
use crate::source::{FindingStream, Source};
use crate::types::RawFinding;

use super::request::HttpLookup;

/// One value to extract from the response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonResult {
    /// JSON pointer or dotted path.
    pub key: String,
    /// Label for the extracted values.
    pub pretty_name: Option<String>,
    /// Yield one finding per array element instead of joining them.
    #[serde(default)]
    pub multi_match: bool,
}

impl JsonResult {
    fn pointer(&self) -> String {
        if self.key.starts_with('/') {
            self.key.clone()
        } else {
            format!("/{}", self.key.replace('.', "/"))
        }
    }
}

/// JSON API source.
#[derive(Debug)]
pub struct JsonSource {
    http: HttpLookup,
    results: Vec<JsonResult>,
}

impl JsonSource {
    /// Build from the site's `json` kind table.
    pub fn new(http: HttpLookup, kind: &Map<String, Value>) -> Result<Self, LookupError> {
        let results = match kind.get("results") {
            Some(results) => serde_json::from_value(results.clone()).map_err(|e| {
                LookupError::Config(format!("site {}: invalid results: {e}", http.site()))
            })?,
            None => Vec::new(),
        };
        Ok(Self { http, results })
    }
}

impl Source for JsonSource {
    fn run(&mut self) -> FindingStream<'_> {
        async_stream::stream! {
            let body = match self.http.fetch().await {
                Ok(body) => body,
                Err(err) => {
                    yield Err(err);
                    return;
                }
            };
            let document: Value = match serde_json::from_str(&body) {
                Ok(document) => document,
                Err(e) => {
                    yield Err(LookupError::Parse(format!(
                        "{} returned invalid JSON: {e}",
                        self.http.site()
                    )));
                    return;
                }
            };
            for finding in extract(&document, &self.results) {
                yield Ok(finding);
            }
        }
        .boxed()
    }
}

/// Apply every `results` entry to `document`, in declaration order.
pub fn extract(document: &Value, results: &[JsonResult]) -> Vec<RawFinding> {
    let mut findings = Vec::new();
    for spec in results {
        let Some(found) = document.pointer(&spec.pointer()) else {
            tracing::trace!(key = %spec.key, "key not present in response");
            continue;
        };
        let values: Vec<String> = match found {
            Value::Array(items) if spec.multi_match => items.iter().filter_map(render).collect(),
            Value::Array(items) => {
                let joined: Vec<String> = items.iter().filter_map(render).collect();
                if joined.is_empty() {
                    Vec::new()
                } else {
                    vec![joined.join(", ")]
                }
            }
            other => render(other).into_iter().collect(),
        };
        findings.extend(values.into_iter().map(|value| RawFinding::Named {
            value,
            pretty_name: spec.pretty_name.clone(),
        }));
    }
    findings
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
