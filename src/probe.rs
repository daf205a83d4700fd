use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Result of a content-type probe. `Unknown` is the sentinel for every
/// failure mode; a probe never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbedType {
    Known(String),
    Unknown,
}

impl ProbedType {
    pub fn as_str(&self) -> &str {
        match self {
            ProbedType::Known(mime) => mime,
            ProbedType::Unknown => "unknown",
        }
    }
}

#[async_trait]
pub trait ContentProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbedType;
}

/// Metadata-only probe: one `HEAD` request, the body is never fetched.
///
/// Redirects are not followed, and targets resolving to loopback, private,
/// link-local or unspecified addresses are never contacted.
#[derive(Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    allow_private_hosts: bool,
}

impl HttpProbe {
    /// `timeout: None` waits indefinitely, like a bare browser fetch.
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder().redirect(redirect::Policy::none());
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().unwrap_or_else(|e| {
            warn!("probe client build failed, using defaults: {e}");
            reqwest::Client::builder()
                .redirect(redirect::Policy::none())
                .build()
                .unwrap_or_default()
        });
        Self { client, allow_private_hosts: false }
    }

    /// Lift the internal-address guard. Only for local development and tests.
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// `true` when every address `target` resolves to is publicly routable.
    async fn is_public_target(&self, target: &str) -> bool {
        if self.allow_private_hosts {
            return true;
        }
        let Ok(url) = Url::parse(target) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<IpAddr>() {
            return !is_internal_ip(ip);
        }
        let port = url.port_or_known_default().unwrap_or(443);
        let public = match tokio::net::lookup_host((host, port)).await {
            Ok(addrs) => {
                let addrs: Vec<_> = addrs.collect();
                !addrs.is_empty() && addrs.iter().all(|a| !is_internal_ip(a.ip()))
            }
            Err(e) => {
                debug!(host, "probe host did not resolve: {e}");
                false
            }
        };
        public
    }
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Scheme-less candidates (`example.com/a.png`) are probed over https.
pub fn probe_target(url: &str) -> String {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[async_trait]
impl ContentProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbedType {
        let target = probe_target(url);
        if !self.is_public_target(&target).await {
            warn!(url = %target, "refusing to probe internal address");
            return ProbedType::Unknown;
        }
        let resp = match self.client.head(&target).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %target, "could not determine content type: {e}");
                return ProbedType::Unknown;
            }
        };
        match resp.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            Some(ct) if !ct.trim().is_empty() => {
                debug!(url = %target, status = %resp.status(), content_type = ct, "probed");
                ProbedType::Known(ct.trim().to_string())
            }
            _ => {
                debug!(url = %target, status = %resp.status(), "no content type header");
                ProbedType::Unknown
            }
        }
    }
}

/// Loopback, private, link-local, unspecified or broadcast.
pub fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_v4(v4),
            None => is_internal_v6(v6),
        },
    }
}

fn is_internal_v4(ip: Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified() || ip.is_broadcast()
}

fn is_internal_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link-local
    ip.is_loopback() || ip.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_target_adds_scheme_only_when_missing() {
        assert_eq!(probe_target("example.com/a.png"), "https://example.com/a.png");
        assert_eq!(probe_target("http://example.com"), "http://example.com");
        assert_eq!(probe_target("HTTPS://example.com"), "HTTPS://example.com");
        assert_eq!(probe_target("a.io"), "https://a.io");
    }

    #[test]
    fn internal_addresses() {
        for raw in ["127.0.0.1", "10.1.2.3", "172.16.0.9", "192.168.1.1", "169.254.169.254", "0.0.0.0", "::1", "fd00::1", "fe80::1", "::ffff:127.0.0.1"] {
            assert!(is_internal_ip(raw.parse().unwrap()), "{raw}");
        }
        for raw in ["93.184.216.34", "8.8.8.8", "2606:4700::1111"] {
            assert!(!is_internal_ip(raw.parse().unwrap()), "{raw}");
        }
    }

    #[tokio::test]
    async fn internal_literals_are_refused_before_any_request() {
        let probe = HttpProbe::default();
        assert_eq!(probe.probe("127.0.0.1:6379/").await, ProbedType::Unknown);
        assert_eq!(probe.probe("169.254.169.254/latest").await, ProbedType::Unknown);
        assert!(!probe.is_public_target("http://[::1]:8080/").await);
        assert!(probe.clone().allow_private_hosts(true).is_public_target("http://127.0.0.1/").await);
    }

    #[test]
    fn unknown_sentinel() {
        assert_eq!(ProbedType::Unknown.as_str(), "unknown");
        assert_eq!(ProbedType::Known("image/png".into()).as_str(), "image/png");
    }
}
