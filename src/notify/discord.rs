use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Notification, Notifier};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
const CONTENT_LIMIT: usize = 2000;
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// Posts notifications to one channel through the bot REST API.
///
/// One attempt per notification; the caller decides what a failure means.
#[derive(Clone)]
pub struct DiscordNotifier {
    client: Client,
    api_base: String,
    channel_id: u64,
    token: String,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(channel_id: u64, token: String) -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            channel_id,
            token,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/channels/{}/messages", self.api_base, self.channel_id)
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        let payload = MessagePayload::from(n);

        self.client
            .post(self.messages_url())
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("discord post")?
            .error_for_status()
            .context("discord non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<DiscordEmbed>,
}

impl From<&Notification> for MessagePayload {
    fn from(n: &Notification) -> Self {
        Self {
            content: truncate_chars(&n.text, CONTENT_LIMIT),
            embeds: n
                .embed
                .iter()
                .map(|e| DiscordEmbed {
                    title: e.title.clone(),
                    description: truncate_chars(&e.description, EMBED_DESCRIPTION_LIMIT),
                })
                .collect(),
        }
    }
}

/// Cut to at most `max` chars, ending in an ellipsis when cut.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
