//! Notifier trait
//!
//! A notifier delivers a [`FailoverEvent`] to one external sink. Delivery
//! failures are logged and never retried, and dispatch always happens off the
//! reconciliation loop so a slow sink cannot stall failover.

use async_trait::async_trait;

use crate::error::Result;
use crate::event::FailoverEvent;

/// Trait for notification sink implementations
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one event to the sink
    async fn notify(&self, event: &FailoverEvent) -> Result<()>;

    /// Sink name, for logging ("slack", "discord")
    fn name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a notifier posting to the given webhook URL
    fn create(&self, webhook_url: &str) -> Result<std::sync::Arc<dyn Notifier>>;
}
