//! # HTTP / HTTPS health checker
//!
//! Probes one IP with a single GET request. The configured timeout covers
//! the whole request (connect, headers, body). When a `host` is configured
//! it is used both as the Host header and as the TLS SNI server name: DNS
//! resolution for that hostname is pinned to the probed IP, so the request
//! carries the real hostname while the connection goes to the candidate
//! address.
//!
//! Redirects are not followed; any status in `[200, 400)` counts as healthy.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;

use gslb_core::config::{CheckKind, HealthCheck};
use gslb_core::registry::ComponentRegistry;
use gslb_core::traits::{HealthChecker, HealthCheckerFactory};
use gslb_core::{Error, Result};

/// HTTP/HTTPS health checker for one origin
pub struct HttpChecker {
    https: bool,
    endpoint: String,
    host: Option<String>,
    timeout: Duration,
    insecure_skip_verify: bool,
    headers: HeaderMap,
}

impl HttpChecker {
    /// Build a checker from a health-check spec.
    ///
    /// Header names and values are validated here so a bad spec fails at
    /// startup instead of marking every probe unhealthy.
    pub fn new(spec: &HealthCheck, https: bool) -> Result<Self> {
        let host = if spec.host.is_empty() {
            None
        } else {
            Some(spec.host.clone())
        };

        Ok(Self {
            https,
            endpoint: spec.endpoint.clone(),
            host,
            timeout: spec.timeout(),
            insecure_skip_verify: spec.insecure_skip_verify,
            headers: build_headers(&spec.headers)?,
        })
    }

    fn scheme(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }
}

#[async_trait]
impl HealthChecker for HttpChecker {
    async fn check(&self, addr: IpAddr) -> Result<()> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(Policy::none());

        if self.https && self.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Pinning the hostname to the probed address gives us the Host
        // header and the SNI name in one move.
        if let Some(host) = &self.host {
            let port = if self.https { 443 } else { 80 };
            builder = builder.resolve(host, SocketAddr::new(addr, port));
        }

        let client = builder
            .build()
            .map_err(|err| Error::probe(format!("failed to build HTTP client: {}", err)))?;

        let url = probe_url(self.scheme(), self.host.as_deref(), addr, &self.endpoint);

        let response = client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|err| Error::probe(format!("request to {} failed: {}", url, err)))?;

        let status = response.status().as_u16();
        if status_is_healthy(status) {
            Ok(())
        } else {
            Err(Error::probe(format!("unexpected status code {}", status)))
        }
    }

    fn kind(&self) -> &'static str {
        if self.https {
            "https"
        } else {
            "http"
        }
    }
}

/// Whether `status` counts as healthy
fn status_is_healthy(status: u16) -> bool {
    (200..400).contains(&status)
}

/// URL the probe requests. IPv6 literals are bracketed; when `host` is set
/// the URL carries the hostname and resolution is pinned elsewhere.
fn probe_url(scheme: &str, host: Option<&str>, addr: IpAddr, endpoint: &str) -> String {
    match host {
        Some(host) => format!("{}://{}{}", scheme, host, endpoint),
        None => match addr {
            IpAddr::V4(v4) => format!("{}://{}{}", scheme, v4, endpoint),
            IpAddr::V6(v6) => format!("{}://[{}]{}", scheme, v6, endpoint),
        },
    }
}

fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if name.is_empty() {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| Error::config(format!("invalid header name {}: {}", name, err)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| Error::config(format!("invalid value for header {}: {}", name, err)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

/// Factory for HTTP and HTTPS checkers; registered under both type names
pub struct HttpCheckerFactory;

impl HealthCheckerFactory for HttpCheckerFactory {
    fn create(&self, spec: &HealthCheck) -> Result<Arc<dyn HealthChecker>> {
        let https = match spec.kind {
            CheckKind::Http => false,
            CheckKind::Https => true,
            CheckKind::Icmp => {
                return Err(Error::config(
                    "HTTP checker factory cannot build an icmp checker",
                ))
            }
        };

        Ok(Arc::new(HttpChecker::new(spec, https)?))
    }
}

/// Register the HTTP and HTTPS checkers with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_checker("http", Box::new(HttpCheckerFactory));
    registry.register_checker("https", Box::new(HttpCheckerFactory));
}
