//! Core trait definitions
//!
//! The seams between the control loop and the outside world:
//! - [`DnsBackend`]: record CRUD plus set replacement within one zone
//! - [`HealthChecker`]: probe one IP, report healthy or unhealthy
//! - [`Notifier`]: deliver a failover event to an external sink
//!
//! Each trait has a companion factory trait used by the component registry.

pub mod dns_backend;
pub mod health_check;
pub mod notifier;

pub use dns_backend::{BackendParams, DnsBackend, DnsBackendFactory, DnsRecord, RECORD_TTL_SECS};
pub use health_check::{HealthChecker, HealthCheckerFactory};
pub use notifier::{Notifier, NotifierFactory};
