// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod ingest;
pub mod notify;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::classify::{classify, Classification, RenderedAlert, Tier};
pub use crate::ingest::cache::{ActiveAlert, CacheEntry, DedupCache};
pub use crate::ingest::scheduler::{supervise, Halted, Poller, PollerCfg, PollerState};
pub use crate::ingest::types::{AlertFeed, FetchOutcome, FetchState, MonitoredPoint, RawAlert};
pub use crate::notify::{Notification, Notifier};
