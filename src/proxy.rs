//! Proxy resolution from the command line or the environment.

use machinae_lookup::ProxyConfig;

/// Resolve proxies from the process environment.
///
/// See [`resolve_with`].
pub fn resolve(cli_proxy: Option<&str>) -> ProxyConfig {
    resolve_with(cli_proxy, |key| std::env::var(key).ok())
}

/// Resolve proxies with a custom environment lookup.
///
/// An explicit proxy applies to both schemes. Otherwise `HTTP_PROXY` (then
/// `http_proxy`) and `HTTPS_PROXY` (then `https_proxy`) are used. Whatever
/// ends up configured is logged.
pub fn resolve_with<F>(cli_proxy: Option<&str>, env: F) -> ProxyConfig
where
    F: Fn(&str) -> Option<String>,
{
    let proxies = match cli_proxy {
        Some(url) => ProxyConfig::both(url),
        None => {
            let lookup = |upper: &str, lower: &str| {
                env(upper)
                    .or_else(|| env(lower))
                    .filter(|value| !value.is_empty())
            };
            ProxyConfig {
                http: lookup("HTTP_PROXY", "http_proxy"),
                https: lookup("HTTPS_PROXY", "https_proxy"),
            }
        }
    };

    if let Some(ref http) = proxies.http {
        tracing::info!(proxy = %http, "HTTP proxy");
    }
    if let Some(ref https) = proxies.https {
        tracing::info!(proxy = %https, "HTTPS proxy");
    }
    proxies
}
