//! Slack webhook notifier

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use gslb_core::event::FailoverEvent;
use gslb_core::traits::{Notifier, NotifierFactory};
use gslb_core::{Error, Result};

use crate::{event_type, FOOTER_TEXT, NOTIFY_TIMEOUT};

/// Notifier posting failover events to a Slack incoming webhook
pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    /// Create a notifier for one webhook URL
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let webhook_url = webhook_url.into();
        if webhook_url.is_empty() {
            return Err(Error::config("Slack webhook URL cannot be empty"));
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
impl Notifier for SlackNotifier {
    async fn notify(&self, event: &FailoverEvent) -> Result<()> {
        let message = build_message(event);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await
            .map_err(|err| Error::notification(format!("failed to send Slack notification: {}", err)))?;

        if response.status().as_u16() != 200 {
            return Err(Error::notification(format!(
                "Slack webhook returned status: {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}

#[derive(Debug, Serialize)]
struct SlackMessage {
    text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    color: &'static str,
    fields: Vec<SlackField>,
    footer: &'static str,
    ts: i64,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: &'static str,
    value: String,
    short: bool,
}

fn color_for(event: &FailoverEvent) -> &'static str {
    if event.return_to_priority && event.is_priority_ip {
        "good"
    } else if event.is_failover_ip {
        "danger"
    } else {
        "warning"
    }
}

fn build_message(event: &FailoverEvent) -> SlackMessage {
    SlackMessage {
        text: format!(
            "*DNS Failover Event* - {}.{}",
            event.origin_name, event.zone_name
        ),
        attachments: vec![SlackAttachment {
            color: color_for(event),
            fields: vec![
                SlackField {
                    title: "Origin",
                    value: event.origin_display(),
                    short: true,
                },
                SlackField {
                    title: "Old IP",
                    value: event.old_ip().to_string(),
                    short: true,
                },
                SlackField {
                    title: "New IP",
                    value: event.new_ips_display(),
                    short: true,
                },
                SlackField {
                    title: "Event Type",
                    value: event_type(event).to_string(),
                    short: true,
                },
                SlackField {
                    title: "Reason",
                    value: event.reason.clone(),
                    short: false,
                },
            ],
            footer: FOOTER_TEXT,
            ts: event.timestamp.timestamp(),
        }],
    }
}

/// Factory for Slack notifiers
pub struct SlackNotifierFactory;

impl NotifierFactory for SlackNotifierFactory {
    fn create(&self, webhook_url: &str) -> Result<Arc<dyn Notifier>> {
        Ok(Arc::new(SlackNotifier::new(webhook_url)?))
    }
}
