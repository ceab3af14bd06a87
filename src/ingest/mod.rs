// src/ingest/mod.rs
pub mod cache;
pub mod client;
pub mod config;
pub mod scheduler;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::classify::{classify, Classification};
use crate::ingest::cache::DedupCache;
use crate::ingest::types::{MonitoredPoint, RawAlert};
use crate::notify::Notifier;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_total", "Feed fetches by outcome.");
        describe_histogram!("fetch_ms", "Feed round-trip time in milliseconds.");
        describe_counter!(
            "alerts_malformed_total",
            "Alert objects skipped because they failed to decode."
        );
        describe_counter!("alerts_delivered_total", "Alerts announced successfully.");
        describe_counter!(
            "alerts_unsupported_total",
            "Alerts skipped because their event type has no template."
        );
        describe_counter!(
            "delivery_failures_total",
            "Notifications the output channel rejected."
        );
        describe_counter!("cache_evicted_total", "Expired alerts removed from the cache.");
        describe_counter!("poller_restarts_total", "Supervised poller restarts.");
        describe_gauge!("active_alerts", "Alerts currently held in the dedup cache.");
    });
}

/// Tally of one point's alert batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub delivered: usize,
    pub duplicates: usize,
    pub unsupported: usize,
    pub delivery_failures: usize,
}

/// Admission for one point's alerts, in upstream order.
///
/// Each new, classifiable id is sent once and then cached. The id is cached
/// even when sending fails, so a dead channel costs one attempt per alert
/// rather than one per cycle.
pub async fn admit_batch<N>(
    cache: &mut DedupCache,
    point: &MonitoredPoint,
    alerts: Vec<RawAlert>,
    notifier: &N,
) -> BatchReport
where
    N: Notifier + ?Sized,
{
    let mut report = BatchReport::default();

    for alert in alerts {
        if cache.contains(&alert.id) {
            report.duplicates += 1;
            continue;
        }

        let rendered = match classify(&alert, &point.name) {
            Classification::Rendered(r) => r,
            Classification::Unsupported { event } => {
                tracing::info!(
                    target: "ingest",
                    point = %point.name,
                    id = %alert.id,
                    event = %event,
                    "no template for event type; skipping"
                );
                counter!("alerts_unsupported_total").increment(1);
                report.unsupported += 1;
                continue;
            }
        };

        match notifier.send(&rendered.notification).await {
            Ok(()) => {
                tracing::info!(
                    target: "ingest",
                    point = %point.name,
                    id = %rendered.id,
                    tier = rendered.tier.label(),
                    "alert sent"
                );
                counter!("alerts_delivered_total").increment(1);
                report.delivered += 1;
            }
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    point = %point.name,
                    id = %rendered.id,
                    tier = rendered.tier.label(),
                    notifier = notifier.name(),
                    error = ?e,
                    "delivery failed; alert will not be retried"
                );
                counter!("delivery_failures_total").increment(1);
                report.delivery_failures += 1;
            }
        }

        cache.admit(rendered.id, rendered.entry);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Coordinates;
    use crate::notify::RecordingNotifier;
    use chrono::{Duration, Utc};

    fn point() -> MonitoredPoint {
        MonitoredPoint::new(
            "Marion, IL",
            Coordinates {
                lat: 37.7308,
                lon: -88.9277,
            },
        )
    }

    fn alert(id: &str, event: &str) -> RawAlert {
        RawAlert {
            id: id.into(),
            event: event.into(),
            headline: format!("{event} headline"),
            description: "details".into(),
            expires: Utc::now() + Duration::hours(1),
            message_type: "Alert".into(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn same_id_is_announced_once_across_batches() {
        let mut cache = DedupCache::new();
        let n = RecordingNotifier::new();

        let first = admit_batch(&mut cache, &point(), vec![alert("a", "Flood Watch")], &n).await;
        let second = admit_batch(&mut cache, &point(), vec![alert("a", "Flood Watch")], &n).await;

        assert_eq!(first.delivered, 1);
        assert_eq!(second.delivered, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(n.texts().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_within_one_batch_is_sent_once() {
        let mut cache = DedupCache::new();
        let n = RecordingNotifier::new();
        let batch = vec![alert("a", "Flood Watch"), alert("a", "Flood Watch")];

        let r = admit_batch(&mut cache, &point(), batch, &n).await;
        assert_eq!((r.delivered, r.duplicates), (1, 1));
    }

    #[tokio::test]
    async fn unsupported_is_skipped_without_stopping_the_batch() {
        let mut cache = DedupCache::new();
        let n = RecordingNotifier::new();
        let batch = vec![
            alert("x", "Frost Advisory"),
            alert("b", "Winter Storm Watch"),
        ];

        let r = admit_batch(&mut cache, &point(), batch, &n).await;
        assert_eq!(r.unsupported, 1);
        assert_eq!(r.delivered, 1);
        assert!(!cache.contains("x"));
        assert!(cache.contains("b"));
        assert_eq!(n.texts().len(), 1);
    }

    #[tokio::test]
    async fn failed_delivery_still_marks_alert_seen() {
        let mut cache = DedupCache::new();
        let n = RecordingNotifier::failing();

        let r = admit_batch(&mut cache, &point(), vec![alert("a", "Flood Warning")], &n).await;
        assert_eq!(r.delivery_failures, 1);
        assert!(cache.contains("a"));

        let again = admit_batch(&mut cache, &point(), vec![alert("a", "Flood Warning")], &n).await;
        assert_eq!(again.duplicates, 1);
        assert_eq!(n.sent.lock().unwrap().len(), 1);
    }
}
