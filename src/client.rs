//! Outbound HTTP client configuration.
//!
//! Proxy settings are read from the environment once, when the configuration
//! is built, and handed to the client explicitly. The client never consults
//! the environment again, so several clients with different settings can
//! live in one process.

/// Environment variables consulted for a proxy, first match wins
pub const PROXY_ENV_VARS: [&str; 4] = ["HTTP_PROXY", "HTTPS_PROXY", "http_proxy", "https_proxy"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy URL applied to every request, `None` for direct connections
    pub url: Option<String>,
}

impl ProxyConfig {
    /// Read the proxy from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the proxy through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = PROXY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty());

        Self { url }
    }

    pub fn direct() -> Self {
        Self { url: None }
    }
}

/// Build a client that uses exactly the proxy in `proxy`.
pub fn build_client(proxy: &ProxyConfig) -> reqwest::Result<reqwest::Client> {
    let builder = reqwest::Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));

    let builder = match &proxy.url {
        Some(url) => {
            tracing::info!(proxy = %url, "Using proxy for outbound HTTP");
            builder.proxy(reqwest::Proxy::all(url)?)
        }
        None => builder.no_proxy(),
    };

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_first_set_variable_wins() {
        let proxy = ProxyConfig::from_lookup(lookup_from(&[
            ("https_proxy", "http://lower:3128"),
            ("HTTPS_PROXY", "http://upper:3128"),
        ]));
        assert_eq!(proxy.url.as_deref(), Some("http://upper:3128"));

        let proxy = ProxyConfig::from_lookup(lookup_from(&[
            ("HTTP_PROXY", "http://first:8080"),
            ("HTTPS_PROXY", "http://second:8080"),
        ]));
        assert_eq!(proxy.url.as_deref(), Some("http://first:8080"));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let proxy = ProxyConfig::from_lookup(lookup_from(&[
            ("HTTP_PROXY", ""),
            ("http_proxy", "http://fallback:3128"),
        ]));
        assert_eq!(proxy.url.as_deref(), Some("http://fallback:3128"));

        assert_eq!(ProxyConfig::from_lookup(lookup_from(&[])), ProxyConfig::direct());
    }

    #[test]
    fn test_build_client_with_and_without_proxy() {
        build_client(&ProxyConfig::direct()).unwrap();
        build_client(&ProxyConfig {
            url: Some("http://proxy.local:3128".to_string()),
        })
        .unwrap();
    }
}
