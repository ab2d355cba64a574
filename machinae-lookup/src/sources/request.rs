//! HTTP request description shared by every source kind.
//!
//! A site's `request` table says where to send the lookup; `{target}` in the
//! URL, params and form data is replaced with the current target.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::LookupError;
use crate::http;
use crate::source::{Credentials, ProxyConfig};

const TARGET_PLACEHOLDER: &str = "{target}";

/// Everything but RFC 3986 unreserved characters is escaped in the URL.
const URL_TARGET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// HTTP method of a lookup request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// `GET`, the default.
    #[default]
    Get,
    /// `POST` with `data` sent as a form body.
    Post,
}

/// The `request` table of a site.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestSpec {
    /// URL template.
    pub url: String,
    /// HTTP method.
    #[serde(default)]
    pub method: Method,
    /// Query parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Form fields, sent with `post`.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Extra request headers.
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Name of a credentials entry to authenticate with.
    pub auth: Option<String>,
    /// User-Agent override; rotates through browser agents when absent.
    pub user_agent: Option<String>,
}

impl RequestSpec {
    /// Parse the `request` table of a kind table.
    pub fn from_kind(site: &str, kind: &Map<String, Value>) -> Result<Self, LookupError> {
        let Some(request) = kind.get("request") else {
            return Err(LookupError::Config(format!("site {site}: missing request table")));
        };
        serde_json::from_value(request.clone())
            .map_err(|e| LookupError::Config(format!("site {site}: invalid request: {e}")))
    }

    /// The URL with the target percent-encoded in place of `{target}`.
    pub fn render_url(&self, target: &str) -> String {
        let encoded = utf8_percent_encode(target, URL_TARGET).to_string();
        self.url.replace(TARGET_PLACEHOLDER, &encoded)
    }

    fn render_pairs(pairs: &Map<String, Value>, target: &str) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.replace(TARGET_PLACEHOLDER, target),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }
}

/// How a request authenticates, resolved from the credentials file.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Send `value` in header `name`.
    Header {
        /// Header name.
        name: String,
        /// Header value.
        value: String,
    },
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
}

// Credential values never reach logs.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Header { name, .. } => f.debug_struct("Header").field("name", name).finish_non_exhaustive(),
            Self::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
        }
    }
}

impl Auth {
    /// Resolve credentials entry `name`.
    ///
    /// The entry needs either `header` + `value` or `username` + `password`.
    pub fn resolve(site: &str, name: &str, credentials: &Credentials) -> Result<Self, LookupError> {
        let Some(entry) = credentials.get(name).and_then(Value::as_object) else {
            return Err(LookupError::Config(format!(
                "site {site}: no credentials entry named {name}"
            )));
        };
        let field = |key: &str| entry.get(key).and_then(Value::as_str).map(str::to_owned);

        if let (Some(name), Some(value)) = (field("header"), field("value")) {
            return Ok(Self::Header { name, value });
        }
        if let (Some(username), Some(password)) = (field("username"), field("password")) {
            return Ok(Self::Basic { username, password });
        }
        Err(LookupError::Config(format!(
            "site {site}: credentials entry {name} needs header/value or username/password"
        )))
    }
}

/// A ready-to-send lookup for one target.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    site: String,
    target: String,
    verbose: bool,
    request: RequestSpec,
    auth: Option<Auth>,
    client: reqwest::Client,
}

impl HttpLookup {
    /// Prepare the request for `target`, resolving auth and building a client.
    pub fn new(
        site: &str,
        target: &str,
        verbose: bool,
        request: RequestSpec,
        credentials: &Credentials,
        proxies: &ProxyConfig,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let auth = match request.auth {
            Some(ref name) => Some(Auth::resolve(site, name, credentials)?),
            None => None,
        };
        let client = http::build_client(proxies, timeout, request.user_agent.as_deref())?;
        Ok(Self {
            site: site.to_owned(),
            target: target.to_owned(),
            verbose,
            request,
            auth,
            client,
        })
    }

    /// Site name this lookup belongs to.
    pub fn site(&self) -> &str {
        &self.site
    }

    /// Send the request and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Http`] on transport failure or a non-success status.
    pub async fn fetch(&self) -> Result<String, LookupError> {
        let url = self.request.render_url(&self.target);
        if self.verbose {
            tracing::info!(site = %self.site, %url, "querying site");
        } else {
            tracing::debug!(site = %self.site, %url, "querying site");
        }

        let mut builder = match self.request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !self.request.params.is_empty() {
            builder = builder.query(&RequestSpec::render_pairs(&self.request.params, &self.target));
        }
        if self.request.method == Method::Post && !self.request.data.is_empty() {
            builder = builder.form(&RequestSpec::render_pairs(&self.request.data, &self.target));
        }
        for (name, value) in RequestSpec::render_pairs(&self.request.headers, &self.target) {
            builder = builder.header(name, value);
        }
        builder = match self.auth {
            Some(Auth::Header { ref name, ref value }) => builder.header(name.as_str(), value.as_str()),
            Some(Auth::Basic { ref username, ref password }) => builder.basic_auth(username, Some(password)),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| LookupError::Http(format!("{} request failed: {e}", self.site)))?
            .error_for_status()
            .map_err(|e| LookupError::Http(format!("{} HTTP error: {e}", self.site)))?;

        let body = response
            .text()
            .await
            .map_err(|e| LookupError::Http(format!("{} response read failed: {e}", self.site)))?;

        tracing::trace!(site = %self.site, bytes = body.len(), "response received");
        Ok(body)
    }
}
