// src/notify/console.rs
//! Operator console relay: every non-blank stdin line goes to the output channel.
//! Independent of the poller; never touches the alert cache.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use super::{Notification, Notifier};

/// Relay lines until EOF. Returns how many lines were delivered.
pub async fn relay_lines<R, N>(reader: R, notifier: &N) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    N: Notifier + ?Sized,
{
    let mut lines = reader.lines();
    let mut delivered = 0usize;

    while let Some(line) = lines.next_line().await.context("reading console input")? {
        let text = line.trim_end();
        if text.trim().is_empty() {
            continue;
        }
        match notifier.send(&Notification::text(text)).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::warn!(target: "console", error = ?e, "console relay send failed"),
        }
    }
    Ok(delivered)
}

/// Spawn the stdin relay task.
pub fn spawn_console_relay<N>(notifier: Arc<N>) -> JoinHandle<()>
where
    N: Notifier + ?Sized + 'static,
{
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        match relay_lines(stdin, &*notifier).await {
            Ok(n) => tracing::info!(target: "console", relayed = n, "console input closed"),
            Err(e) => tracing::warn!(target: "console", error = ?e, "console relay stopped"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;

    #[tokio::test]
    async fn relays_non_blank_lines_in_order() {
        let input: &[u8] = b"first\n\n   \nsecond  \r\n";
        let n = RecordingNotifier::new();
        let count = relay_lines(input, &n).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(n.texts(), vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn send_failures_do_not_stop_the_relay() {
        let input: &[u8] = b"a\nb\n";
        let n = RecordingNotifier::failing();
        let count = relay_lines(input, &n).await.unwrap();
        assert_eq!(count, 0);
        assert_eq!(n.sent.lock().unwrap().len(), 2);
    }
}
