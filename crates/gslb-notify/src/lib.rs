//! # Webhook notifiers
//!
//! Slack and Discord implementations of the [`Notifier`] trait. Both post a
//! JSON payload describing a failover event to a webhook URL, with a
//! per-request timeout independent of the reconciliation loop.
//!
//! Delivery failures are reported to the caller, logged there, and never
//! retried.

pub mod discord;
pub mod slack;

pub use discord::{DiscordNotifier, DiscordNotifierFactory};
pub use slack::{SlackNotifier, SlackNotifierFactory};

use std::time::Duration;

use gslb_core::event::FailoverEvent;
use gslb_core::registry::ComponentRegistry;

/// Per-request timeout for webhook deliveries
pub(crate) const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Footer shown on every notification
pub(crate) const FOOTER_TEXT: &str = "Cloudflare GSLB";

/// Human-readable classification of an event, shared by both sinks
pub(crate) fn event_type(event: &FailoverEvent) -> &'static str {
    if event.return_to_priority && event.is_priority_ip {
        "Recovery (Return to Priority IP)"
    } else if event.is_priority_ip {
        "Failover to Priority IP"
    } else if event.is_failover_ip {
        "Failover to Backup IP"
    } else {
        "Failover"
    }
}

/// Register the Slack and Discord notifiers with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_notifier("slack", Box::new(SlackNotifierFactory));
    registry.register_notifier("discord", Box::new(DiscordNotifierFactory));
}
