//! # ICMP health checker
//!
//! Probes one IP with a single ICMP echo request (ICMPv4 type 8 for IPv4
//! targets, ICMPv6 type 128 for IPv6 targets) and reports healthy iff a
//! matching echo reply arrives within the timeout. The identifier is the low
//! 16 bits of the process id and the payload is the 4-byte string `PING`.
//!
//! Raw ICMP sockets usually require elevated privileges. Constructing the
//! checker always succeeds; when the OS denies the socket, `check` reports a
//! probe error, so deployments with HTTP-only origins still start.
//!
//! The socket is opened inside `check` and released before it returns, on
//! every path.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use surge_ping::{Client, Config, PingIdentifier, PingSequence, ICMP};

use gslb_core::config::{CheckKind, HealthCheck};
use gslb_core::registry::ComponentRegistry;
use gslb_core::traits::{HealthChecker, HealthCheckerFactory};
use gslb_core::{Error, Result};

/// Echo request payload, matching the 4-byte budget of the probe
const ECHO_PAYLOAD: &[u8] = b"PING";

/// ICMP echo health checker
pub struct IcmpChecker {
    timeout: Duration,
}

impl IcmpChecker {
    /// Build a checker from a health-check spec
    pub fn new(spec: &HealthCheck) -> Self {
        Self {
            timeout: spec.timeout(),
        }
    }
}

#[async_trait]
impl HealthChecker for IcmpChecker {
    async fn check(&self, addr: IpAddr) -> Result<()> {
        let kind = match addr {
            IpAddr::V4(_) => ICMP::V4,
            IpAddr::V6(_) => ICMP::V6,
        };

        let config = Config::builder().kind(kind).build();
        let client = Client::new(&config)
            .map_err(|err| Error::probe(format!("failed to open ICMP socket: {}", err)))?;

        let identifier = PingIdentifier((std::process::id() & 0xffff) as u16);
        let mut pinger = client.pinger(addr, identifier).await;
        pinger.timeout(self.timeout);

        match pinger.ping(PingSequence(1), ECHO_PAYLOAD).await {
            Ok((_packet, rtt)) => {
                tracing::debug!("ICMP echo reply from {} in {:?}", addr, rtt);
                Ok(())
            }
            Err(err) => Err(Error::probe(format!("ICMP echo to {} failed: {}", addr, err))),
        }
    }

    fn kind(&self) -> &'static str {
        "icmp"
    }
}

/// Factory for ICMP checkers
pub struct IcmpCheckerFactory;

impl HealthCheckerFactory for IcmpCheckerFactory {
    fn create(&self, spec: &HealthCheck) -> Result<Arc<dyn HealthChecker>> {
        if spec.kind != CheckKind::Icmp {
            return Err(Error::config(
                "ICMP checker factory cannot build an http checker",
            ));
        }
        Ok(Arc::new(IcmpChecker::new(spec)))
    }
}

/// Register the ICMP checker with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_checker("icmp", Box::new(IcmpCheckerFactory));
}
