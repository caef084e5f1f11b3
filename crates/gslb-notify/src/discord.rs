//! Discord webhook notifier

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use gslb_core::event::FailoverEvent;
use gslb_core::traits::{Notifier, NotifierFactory};
use gslb_core::{Error, Result};

use crate::{event_type, FOOTER_TEXT, NOTIFY_TIMEOUT};

/// Yellow, for plain transitions
const COLOR_WARNING: u32 = 16776960;
/// Green, for recoveries back to the priority level
const COLOR_SUCCESS: u32 = 5763719;
/// Red, for failovers to a backup level
const COLOR_DANGER: u32 = 15158332;

/// Notifier posting failover events to a Discord webhook
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    /// Create a notifier for one webhook URL
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let webhook_url = webhook_url.into();
        if webhook_url.is_empty() {
            return Err(Error::config("Discord webhook URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|err| Error::notification(format!("failed to build HTTP client: {}", err)))?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, event: &FailoverEvent) -> Result<()> {
        let message = build_message(event);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|err| {
                Error::notification(format!("failed to send Discord notification: {}", err))
            })?;

        let status = response.status().as_u16();
        if status != 200 && status != 204 {
            return Err(Error::notification(format!(
                "Discord webhook returned status: {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Debug, Serialize)]
struct DiscordMessage {
    embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<DiscordField>,
    footer: DiscordFooter,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: &'static str,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct DiscordFooter {
    text: &'static str,
}

fn color_for(event: &FailoverEvent) -> u32 {
    if event.return_to_priority && event.is_priority_ip {
        COLOR_SUCCESS
    } else if event.is_failover_ip {
        COLOR_DANGER
    } else {
        COLOR_WARNING
    }
}

fn build_message(event: &FailoverEvent) -> DiscordMessage {
    DiscordMessage {
        embeds: vec![DiscordEmbed {
            title: format!(
                "🔄 DNS Failover Event - {}.{}",
                event.origin_name, event.zone_name
            ),
            description: event.reason.clone(),
            color: color_for(event),
            fields: vec![
                DiscordField {
                    name: "Origin",
                    value: event.origin_display(),
                    inline: true,
                },
                DiscordField {
                    name: "Event Type",
                    value: event_type(event).to_string(),
                    inline: true,
                },
                DiscordField {
                    name: "Old IP",
                    value: event.old_ip().to_string(),
                    inline: true,
                },
                DiscordField {
                    name: "New IP",
                    value: event.new_ips_display(),
                    inline: true,
                },
            ],
            footer: DiscordFooter { text: FOOTER_TEXT },
            timestamp: event.timestamp.to_rfc3339(),
        }],
    }
}

/// Factory for Discord notifiers
pub struct DiscordNotifierFactory;

impl NotifierFactory for DiscordNotifierFactory {
    fn create(&self, webhook_url: &str) -> Result<Arc<dyn Notifier>> {
        Ok(Arc::new(DiscordNotifier::new(webhook_url)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::event;

    #[test]
    fn test_color_mapping() {
        assert_eq!(color_for(&event(true, false, true)), COLOR_SUCCESS);
        assert_eq!(color_for(&event(false, true, false)), COLOR_DANGER);
        assert_eq!(color_for(&event(true, false, false)), COLOR_WARNING);
    }

    #[test]
    fn test_message_payload_shape() {
        let message = build_message(&event(false, true, false));
        let value = serde_json::to_value(&message).unwrap();

        let embed = &value["embeds"][0];
        assert_eq!(embed["title"], "🔄 DNS Failover Event - www.example.com");
        assert_eq!(
            embed["description"],
            "Priority level 100 unhealthy, switching to level 50"
        );
        assert_eq!(embed["color"], COLOR_DANGER);
        assert_eq!(embed["footer"]["text"], "Cloudflare GSLB");
        assert_eq!(embed["timestamp"], "2024-05-01T12:00:00+00:00");

        let fields = embed["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0]["name"], "Origin");
        assert_eq!(fields[1]["value"], "Failover to Backup IP");
    }

    #[test]
    fn test_empty_webhook_url_is_rejected() {
        assert!(DiscordNotifier::new("").is_err());
    }

    #[test]
    fn test_factory_creates_notifier() {
        let factory = DiscordNotifierFactory;
        let notifier = factory
            .create("https://discord.com/api/webhooks/x")
            .unwrap();
        assert_eq!(notifier.name(), "discord");
    }
}
