//! Health checker trait
//!
//! A checker probes one IP at a time and reports healthy (`Ok`) or unhealthy
//! (`Err`). Checkers are stateless, safe to invoke concurrently and must
//! honor the configured timeout strictly; the reconciliation worker fans one
//! call out per candidate IP each cycle.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::config::HealthCheck;
use crate::error::Result;

/// Trait for health check implementations
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Probe a single address.
    ///
    /// Any transport error, timeout or unexpected response is an error and
    /// counts as "unhealthy for this IP, this cycle".
    async fn check(&self, addr: IpAddr) -> Result<()>;

    /// Check kind, for logging ("http", "https", "icmp")
    fn kind(&self) -> &'static str;
}

/// Helper trait for constructing health checkers from configuration
pub trait HealthCheckerFactory: Send + Sync {
    /// Create a checker from an origin's health-check spec.
    ///
    /// Construction validates the spec eagerly; a checker that cannot work
    /// (bad header name, unsupported kind) fails here rather than at probe
    /// time. Privilege problems, such as a denied raw socket, still surface
    /// from `check` so partially privileged deployments can start.
    fn create(&self, spec: &HealthCheck) -> Result<std::sync::Arc<dyn HealthChecker>>;
}
