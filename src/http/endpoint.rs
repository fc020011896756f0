//! Bound listener endpoints and how they are shown to humans.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// Protocol served by a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Plain,
    Secure,
}

impl Scheme {
    /// Name passed to ready callbacks
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Plain => "plain",
            Scheme::Secure => "secure",
        }
    }

    /// URL scheme clients use to reach the listener
    pub fn url_scheme(&self) -> &'static str {
        match self {
            Scheme::Plain => "http",
            Scheme::Secure => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A listener that bound successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    address: String,
    port: u16,
    scheme: Scheme,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16, scheme: Scheme) -> Self {
        Self {
            address: address.into(),
            port,
            scheme,
        }
    }

    /// Address as configured, wildcards included
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Address a client on this host can connect to
    pub fn display_address(&self) -> &str {
        display_address(&self.address)
    }

    /// Client-facing URL, e.g. `https://127.0.0.1:8190`
    pub fn url(&self) -> String {
        let host = self.display_address();
        if host.parse::<IpAddr>().is_ok_and(|ip| ip.is_ipv6()) {
            format!("{}://[{}]:{}", self.scheme.url_scheme(), host, self.port)
        } else {
            format!("{}://{}:{}", self.scheme.url_scheme(), host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Map wildcard bind addresses to loopback.
///
/// `""` and `"0.0.0.0"` are valid to bind but not to connect to.
pub fn display_address(address: &str) -> &str {
    match address {
        "" | "0.0.0.0" => "127.0.0.1",
        other => other,
    }
}

/// Best-effort IP address of this host, for the startup banner.
///
/// Never fails: if the hostname cannot be resolved the loopback address is
/// returned instead.
pub async fn advertised_ip() -> IpAddr {
    match resolve_hostname().await {
        Ok(ip) => ip,
        Err(e) => {
            tracing::debug!(error = %e, "Hostname lookup downgraded to loopback");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

async fn resolve_hostname() -> std::io::Result<IpAddr> {
    let name = hostname::get()?.into_string().map_err(|raw| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("hostname {:?} is not valid UTF-8", raw),
        )
    })?;

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((name.as_str(), 0))
        .await?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("hostname {} has no addresses", name),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards_display_as_loopback() {
        assert_eq!(display_address(""), "127.0.0.1");
        assert_eq!(display_address("0.0.0.0"), "127.0.0.1");
        assert_eq!(display_address("192.168.1.20"), "192.168.1.20");
        assert_eq!(display_address("localhost"), "localhost");
    }

    #[test]
    fn test_endpoint_url() {
        let plain = Endpoint::new("0.0.0.0", 8189, Scheme::Plain);
        assert_eq!(plain.url(), "http://127.0.0.1:8189");
        assert_eq!(plain.address(), "0.0.0.0");

        let secure = Endpoint::new("", 8190, Scheme::Secure);
        assert_eq!(secure.url(), "https://127.0.0.1:8190");

        let v6 = Endpoint::new("::1", 8443, Scheme::Secure);
        assert_eq!(v6.to_string(), "https://[::1]:8443");
    }

    #[test]
    fn test_scheme_names() {
        assert_eq!(Scheme::Plain.as_str(), "plain");
        assert_eq!(Scheme::Secure.to_string(), "secure");
        assert_eq!(Scheme::Secure.url_scheme(), "https");
    }

    #[tokio::test]
    async fn test_advertised_ip_falls_back_to_loopback() {
        let ip = advertised_ip().await;
        assert!(!ip.is_unspecified());

        if resolve_hostname().await.is_err() {
            assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
    }
}
