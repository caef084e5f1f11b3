//! # gslb-core
//!
//! Core library for the GSLB DNS failover control plane.
//!
//! The system keeps authoritative DNS records at a managed provider in sync
//! with the observed health of a set of candidate origin IPs. For every
//! managed origin it periodically probes the IPs declared for that origin
//! and, whenever the health picture changes, rewrites the provider's record
//! set so queries resolve only to IPs from the highest-priority group that is
//! fully healthy. Recovery is automatic and governed by the per-origin
//! `return_to_priority` policy.
//!
//! ## Architecture
//!
//! - **DnsBackend**: trait for record CRUD and set replacement in one zone
//! - **HealthChecker**: trait for probing a single IP (HTTP, HTTPS, ICMP)
//! - **Notifier**: trait for delivering failover events to external sinks
//! - **ComponentRegistry**: plugin registry the implementation crates
//!   register their factories with
//! - **Service**: supervisor that builds the per-origin components and runs
//!   one reconciliation worker per origin
//!
//! Implementations live in sibling crates (`gslb-backend-cloudflare`,
//! `gslb-check-http`, `gslb-check-icmp`, `gslb-notify`); this crate contains
//! only the control-plane logic and is fully exercisable with test doubles.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod reconciler;
pub mod registry;
pub mod selector;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{Config, HealthCheck, OriginConfig, PriorityLevel, RecordType};
pub use engine::Service;
pub use error::{Error, Result};
pub use event::FailoverEvent;
pub use registry::ComponentRegistry;
pub use state::{OriginKey, OriginState, OriginStateStore};
pub use traits::{DnsBackend, DnsRecord, HealthChecker, Notifier};
