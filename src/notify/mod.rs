pub mod console;
pub mod discord;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

/// Long-form body shown as a distinct block under the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
}

/// One logical message for the output channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub embed: Option<Embed>,
}

impl Notification {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            embed: None,
        }
    }

    pub fn with_embed(mut self, title: impl Into<String>, description: impl Into<String>) -> Self {
        self.embed = Some(Embed {
            title: title.into(),
            description: description.into(),
        });
        self
    }
}

/// Output channel. Delivery may fail; callers log and move on.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, n: &Notification) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send(&self, n: &Notification) -> Result<()> {
        (**self).send(n).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Dry-run sink: logs instead of posting.
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        tracing::info!(
            target: "notify",
            text = %n.text,
            embed = n.embed.as_ref().map(|e| e.title.as_str()),
            "dry-run notification"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// --- Test helper ---
/// Records every notification; optionally fails each send after recording it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.text.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, n: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(n.clone());
        if self.fail {
            return Err(anyhow!("channel unavailable"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
