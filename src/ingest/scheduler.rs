// src/ingest/scheduler.rs
//! Round-robin poller and its restart supervisor.
//!
//! One cycle visits every point in configured order: fetch, admit, pause.
//! After the last point the cache is swept once, then the poller sleeps
//! before the next cycle. A rate-limit response ends polling for good.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Utc;
use futures::FutureExt;
use metrics::{counter, gauge};
use tokio::sync::watch;

use crate::ingest::cache::{sweep, ActiveAlert, DedupCache};
use crate::ingest::types::{AlertFeed, FetchOutcome, FetchState, MonitoredPoint};
use crate::ingest::{admit_batch, ensure_metrics_described};
use crate::notify::Notifier;

/// Publishing side of the active-alerts snapshot.
pub type AlertBoard = Arc<watch::Sender<Vec<ActiveAlert>>>;

pub fn alert_board() -> (AlertBoard, watch::Receiver<Vec<ActiveAlert>>) {
    let (tx, rx) = watch::channel(Vec::new());
    (Arc::new(tx), rx)
}

#[derive(Clone, Copy, Debug)]
pub struct PollerCfg {
    /// Pause after each point's fetch.
    pub request_interval: Duration,
    /// Pause after each full cycle.
    pub cycle_interval: Duration,
    /// Consecutive all-points-failed cycles before the session is rebuilt.
    pub max_failed_cycles: u32,
    /// Wait before rebuilding a failed session.
    pub restart_delay: Duration,
}

impl Default for PollerCfg {
    fn default() -> Self {
        Self {
            request_interval: Duration::from_secs(6),
            cycle_interval: Duration::from_secs(10),
            max_failed_cycles: 3,
            restart_delay: Duration::from_secs(5),
        }
    }
}

/// Everything the poller mutates. Survives supervised restarts.
#[derive(Debug, Default)]
pub struct PollerState {
    pub cache: DedupCache,
    pub fetch: HashMap<String, FetchState>,
}

/// Terminal state: upstream rate-limited us while polling `point`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halted {
    pub point: String,
}

pub struct Poller<F, N: ?Sized> {
    feed: F,
    notifier: Arc<N>,
    points: Vec<MonitoredPoint>,
    cfg: PollerCfg,
    state: PollerState,
    board: AlertBoard,
    failed_cycles: u32,
}

impl<F, N> Poller<F, N>
where
    F: AlertFeed,
    N: Notifier + ?Sized,
{
    pub fn new(
        feed: F,
        notifier: Arc<N>,
        points: Vec<MonitoredPoint>,
        cfg: PollerCfg,
        state: PollerState,
        board: AlertBoard,
    ) -> Self {
        ensure_metrics_described();
        Self {
            feed,
            notifier,
            points,
            cfg,
            state,
            board,
            failed_cycles: 0,
        }
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn into_state(self) -> PollerState {
        self.state
    }

    /// Poll until rate-limited (`Ok(Halted)`) or the session looks dead (`Err`).
    pub async fn run(&mut self) -> Result<Halted> {
        loop {
            let mut transport_failures = 0usize;

            for point in &self.points {
                let fetch_state = self.state.fetch.entry(point.name.clone()).or_default();
                let outcome = self.feed.fetch(point, fetch_state).await;

                match outcome {
                    Ok(outcome) => {
                        counter!("fetch_total", "outcome" => outcome.label()).increment(1);
                        match outcome {
                            FetchOutcome::Fresh(alerts) => {
                                if alerts.is_empty() {
                                    tracing::debug!(target: "ingest", point = %point.name, "no alerts");
                                }
                                let report = admit_batch(
                                    &mut self.state.cache,
                                    point,
                                    alerts,
                                    &*self.notifier,
                                )
                                .await;
                                tracing::debug!(
                                    target: "ingest",
                                    point = %point.name,
                                    delivered = report.delivered,
                                    duplicates = report.duplicates,
                                    unsupported = report.unsupported,
                                    failed = report.delivery_failures,
                                    "batch processed"
                                );
                            }
                            FetchOutcome::NotModified => {
                                tracing::debug!(target: "ingest", point = %point.name, "no updates");
                            }
                            FetchOutcome::UpstreamProblem { status, problem } => {
                                let problem = problem.unwrap_or_default();
                                tracing::warn!(
                                    target: "ingest",
                                    point = %point.name,
                                    status,
                                    title = problem.title.as_deref(),
                                    problem_status = problem.status,
                                    detail = problem.detail.as_deref(),
                                    "upstream problem"
                                );
                            }
                            FetchOutcome::RateLimited => {
                                tracing::error!(
                                    target: "ingest",
                                    point = %point.name,
                                    "rate limited by upstream; halting poller"
                                );
                                return Ok(Halted {
                                    point: point.name.clone(),
                                });
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: "ingest",
                            point = %point.name,
                            feed = self.feed.name(),
                            error = ?e,
                            "fetch failed; moving to next point"
                        );
                        counter!("fetch_total", "outcome" => "transport_error").increment(1);
                        transport_failures += 1;
                    }
                }

                self.publish();
                tokio::time::sleep(self.cfg.request_interval).await;
            }

            let evicted = sweep(&mut self.state.cache, Utc::now());
            if evicted > 0 {
                self.publish();
            }

            if !self.points.is_empty() && transport_failures == self.points.len() {
                self.failed_cycles += 1;
                if self.failed_cycles >= self.cfg.max_failed_cycles {
                    bail!(
                        "every point failed to fetch for {} consecutive cycles",
                        self.failed_cycles
                    );
                }
            } else {
                self.failed_cycles = 0;
            }

            tokio::time::sleep(self.cfg.cycle_interval).await;
        }
    }

    fn publish(&self) {
        let active = self.state.cache.active_alerts();
        gauge!("active_alerts").set(active.len() as f64);
        self.board.send_replace(active);
    }
}

/// Run the poller under a restart supervisor.
///
/// `build_feed` is called for every (re)start so each run gets a fresh HTTP
/// session. Dedup and conditional-fetch state carry over every restart,
/// including one caused by a panic inside the poller. Returns only when the
/// poller halts.
pub async fn supervise<F, B, N>(
    build_feed: B,
    notifier: Arc<N>,
    points: Vec<MonitoredPoint>,
    cfg: PollerCfg,
    board: AlertBoard,
) -> Result<Halted>
where
    F: AlertFeed,
    B: Fn() -> Result<F>,
    N: Notifier + ?Sized,
{
    let mut state = PollerState::default();

    loop {
        let feed = build_feed()?;
        let mut poller = Poller::new(
            feed,
            Arc::clone(&notifier),
            points.clone(),
            cfg,
            state,
            Arc::clone(&board),
        );

        // The poller stays owned here so its state outlives a panic in `run`.
        let outcome = AssertUnwindSafe(poller.run()).catch_unwind().await;
        match outcome {
            Ok(Ok(halted)) => return Ok(halted),
            Ok(Err(e)) => {
                tracing::warn!(target: "ingest", error = ?e, "polling session failed; rebuilding client");
            }
            Err(panic) => {
                tracing::error!(
                    target: "ingest",
                    panic = panic_message(&*panic),
                    "poller panicked; rebuilding client"
                );
            }
        }
        state = poller.into_state();

        counter!("poller_restarts_total").increment(1);
        tokio::time::sleep(cfg.restart_delay).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
