//! HTTP client construction for site lookups.
//!
//! Each lookup gets its own [`reqwest::Client`] carrying the lookup timeout,
//! the configured proxies and a browser User-Agent. Sites that reject
//! non-browser agents keep working without per-site configuration.

use std::time::Duration;

use rand::Rng;

use crate::error::LookupError;
use crate::source::ProxyConfig;

/// Browser User-Agents; one is picked per client unless the site sets its own.
const BROWSER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

const MAX_REDIRECTS: usize = 10;

/// Build the client for one lookup.
///
/// # Errors
///
/// Returns [`LookupError::Http`] if a proxy URL is invalid or the client
/// cannot be constructed.
pub fn build_client(
    proxies: &ProxyConfig,
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<reqwest::Client, LookupError> {
    let agent = match user_agent {
        Some(agent) => agent,
        None => browser_agent(),
    };

    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(agent)
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

    if let Some(url) = proxies.http.as_deref() {
        builder = builder.proxy(proxy(reqwest::Proxy::http(url), "HTTP")?);
    }
    if let Some(url) = proxies.https.as_deref() {
        builder = builder.proxy(proxy(reqwest::Proxy::https(url), "HTTPS")?);
    }

    builder
        .build()
        .map_err(|e| LookupError::Http(format!("failed to build HTTP client: {e}")))
}

fn proxy(
    parsed: reqwest::Result<reqwest::Proxy>,
    scheme: &str,
) -> Result<reqwest::Proxy, LookupError> {
    parsed.map_err(|e| LookupError::Http(format!("invalid {scheme} proxy: {e}")))
}

/// A random browser User-Agent.
pub fn browser_agent() -> &'static str {
    BROWSER_AGENTS[rand::thread_rng().gen_range(0..BROWSER_AGENTS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(proxies: &ProxyConfig, agent: Option<&str>) -> Result<reqwest::Client, LookupError> {
        build_client(proxies, Duration::from_secs(5), agent)
    }

    #[test]
    fn agent_comes_from_rotation() {
        for _ in 0..16 {
            assert!(BROWSER_AGENTS.contains(&browser_agent()));
        }
    }

    #[test]
    fn builds_plain_client() {
        assert!(client(&ProxyConfig::default(), None).is_ok());
    }

    #[test]
    fn builds_with_site_agent() {
        let agent = format!("machinae/{}", env!("CARGO_PKG_VERSION"));
        assert!(client(&ProxyConfig::default(), Some(agent.as_str())).is_ok());
    }

    #[test]
    fn builds_with_proxies() {
        assert!(client(&ProxyConfig::both("http://127.0.0.1:3128"), None).is_ok());
    }

    #[test]
    fn invalid_proxy_is_http_error() {
        let proxies = ProxyConfig {
            http: Some("http://[not-closed".into()),
            https: None,
        };
        let err = client(&proxies, None).unwrap_err();
        assert!(err.to_string().contains("invalid HTTP proxy"));
    }
}
