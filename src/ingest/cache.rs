// src/ingest/cache.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::classify::{render_notification, tier_for};
use crate::ingest::types::RawAlert;

/// What we remember about a delivered alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub expires: DateTime<Utc>,
    pub point: String,
    pub headline: String,
    pub description: String,
    pub message_type: String,
    pub event: String,
    pub tags: Vec<String>,
}

impl CacheEntry {
    pub fn from_alert(alert: &RawAlert, point: &str) -> Self {
        Self {
            expires: alert.expires,
            point: point.to_string(),
            headline: alert.headline.clone(),
            description: alert.description.clone(),
            message_type: alert.message_type.clone(),
            event: alert.event.clone(),
            tags: alert.tags.clone(),
        }
    }

    fn to_alert(&self, id: &str) -> RawAlert {
        RawAlert {
            id: id.to_string(),
            event: self.event.clone(),
            headline: self.headline.clone(),
            description: self.description.clone(),
            expires: self.expires,
            message_type: self.message_type.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Read-only view of one cached alert, published to query readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveAlert {
    pub id: String,
    pub point: String,
    pub event: String,
    pub tier: &'static str,
    pub text: String,
    pub expires: DateTime<Utc>,
}

/// Identifiers already announced, keyed by upstream alert id.
///
/// An id is admitted at most once and never overwritten while present.
#[derive(Debug, Default)]
pub struct DedupCache {
    entries: HashMap<String, CacheEntry>,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert `id` unless already present. Returns whether it was inserted.
    pub fn admit(&mut self, id: String, entry: CacheEntry) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, entry);
        true
    }

    /// Remove every entry whose expiry is not after `now`.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> Vec<(String, CacheEntry)> {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires <= now)
            .map(|(id, _)| id.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|id| self.entries.remove(&id).map(|e| (id, e)))
            .collect()
    }

    /// Re-rendered view of everything cached, ordered by expiry then id.
    pub fn active_alerts(&self) -> Vec<ActiveAlert> {
        let mut out: Vec<ActiveAlert> = self
            .entries
            .iter()
            .filter_map(|(id, e)| {
                let alert = e.to_alert(id);
                let tier = tier_for(&alert)?;
                Some(ActiveAlert {
                    id: id.clone(),
                    point: e.point.clone(),
                    event: e.event.clone(),
                    tier: tier.label(),
                    text: render_notification(tier, &e.point, &alert).text,
                    expires: e.expires,
                })
            })
            .collect();
        out.sort_by(|a, b| a.expires.cmp(&b.expires).then_with(|| a.id.cmp(&b.id)));
        out
    }
}

/// Eviction sweep, run once per full cycle. Only removes and logs.
pub fn sweep(cache: &mut DedupCache, now: DateTime<Utc>) -> usize {
    let removed = cache.evict_expired(now);
    for (id, entry) in &removed {
        tracing::info!(
            target: "cache",
            id = %id,
            point = %entry.point,
            event = %entry.event,
            expires = %entry.expires.to_rfc3339(),
            "alert expired; removed from cache"
        );
    }
    if !removed.is_empty() {
        counter!("cache_evicted_total").increment(removed.len() as u64);
    }
    removed.len()
}
