//! Plugin-based component registry
//!
//! Backends, health checkers and notifiers are registered dynamically at
//! startup, avoiding hardcoded if-else chains in the supervisor. Each
//! implementation crate exposes a `register()` function:
//!
//! ```rust,ignore
//! let registry = ComponentRegistry::new();
//! gslb_backend_cloudflare::register(&registry);
//! gslb_check_http::register(&registry);
//! gslb_check_icmp::register(&registry);
//! gslb_notify::register(&registry);
//!
//! let service = Service::new(config, &registry)?;
//! ```
//!
//! ## Thread safety
//!
//! The registry uses interior mutability with RwLock, allowing concurrent
//! reads and exclusive writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use crate::config::HealthCheck;
use crate::error::{Error, Result};
use crate::traits::{
    BackendParams, DnsBackend, DnsBackendFactory, HealthChecker, HealthCheckerFactory, Notifier,
    NotifierFactory,
};

/// Registry of component factories, keyed by type name
#[derive(Default)]
pub struct ComponentRegistry {
    /// Registered DNS backend factories
    backends: RwLock<HashMap<String, Box<dyn DnsBackendFactory>>>,

    /// Registered health checker factories
    checkers: RwLock<HashMap<String, Box<dyn HealthCheckerFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS backend factory under a provider name
    pub fn register_backend(&self, name: impl Into<String>, factory: Box<dyn DnsBackendFactory>) {
        let mut backends = self.backends.write().unwrap();
        backends.insert(name.into(), factory);
    }

    /// Register a health checker factory under a check type name
    pub fn register_checker(&self, name: impl Into<String>, factory: Box<dyn HealthCheckerFactory>) {
        let mut checkers = self.checkers.write().unwrap();
        checkers.insert(name.into(), factory);
    }

    /// Register a notifier factory under a notification type name
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        let mut notifiers = self.notifiers.write().unwrap();
        notifiers.insert(name.into(), factory);
    }

    /// Create a DNS backend bound to one zone
    pub fn create_backend(&self, provider: &str, params: &BackendParams) -> Result<Arc<dyn DnsBackend>> {
        let backends = self.backends.read().unwrap();
        let factory = backends
            .get(provider)
            .ok_or_else(|| Error::config(format!("unknown DNS backend provider: {}", provider)))?;
        factory.create(params)
    }

    /// Create a health checker from an origin's spec
    pub fn create_checker(&self, spec: &HealthCheck) -> Result<Arc<dyn HealthChecker>> {
        let kind = spec.kind.as_str();
        let checkers = self.checkers.read().unwrap();
        let factory = checkers
            .get(kind)
            .ok_or_else(|| Error::config(format!("unknown health check type: {}", kind)))?;
        factory.create(spec)
    }

    /// Create a notifier for one webhook
    pub fn create_notifier(&self, kind: &str, webhook_url: &str) -> Result<Arc<dyn Notifier>> {
        let notifiers = self.notifiers.read().unwrap();
        let factory = notifiers
            .get(kind)
            .ok_or_else(|| Error::config(format!("unknown notification type: {}", kind)))?;
        factory.create(webhook_url)
    }

    /// Check if a backend provider is registered
    pub fn has_backend(&self, name: &str) -> bool {
        self.backends.read().unwrap().contains_key(name)
    }

    /// Check if a health check type is registered
    pub fn has_checker(&self, name: &str) -> bool {
        self.checkers.read().unwrap().contains_key(name)
    }

    /// Check if a notification type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        self.notifiers.read().unwrap().contains_key(name)
    }
}
