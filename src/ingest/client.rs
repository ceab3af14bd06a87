// src/ingest/client.rs
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{ACCEPT, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::ingest::types::{AlertFeed, FetchOutcome, FetchState, MonitoredPoint, Problem, RawAlert};

pub const DEFAULT_ALERTS_ENDPOINT: &str = "https://api.weather.gov/alerts/active";
const ACCEPT_LD_JSON: &str = "application/ld+json";
const USER_AGENT_BASE: &str = "weatherboy_automated_alerts";

/// User-Agent string; the feed requires a contact fragment to identify the caller.
pub fn user_agent(contact: &str) -> String {
    let contact = contact.trim();
    if contact.is_empty() {
        USER_AGENT_BASE.to_string()
    } else {
        format!("{USER_AGENT_BASE}, {contact}")
    }
}

#[derive(Debug, Deserialize)]
struct AlertCollection {
    #[serde(rename = "@graph", default)]
    graph: Vec<serde_json::Value>,
}

/// Decode the `@graph` list. Items that don't decode are skipped; a bad envelope is an error.
pub fn parse_alert_list(body: &[u8]) -> Result<Vec<RawAlert>> {
    let collection: AlertCollection =
        serde_json::from_slice(body).context("parsing alert collection json")?;

    let mut out = Vec::with_capacity(collection.graph.len());
    for item in collection.graph {
        match serde_json::from_value::<RawAlert>(item) {
            Ok(alert) => out.push(alert),
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "skipping malformed alert");
                counter!("alerts_malformed_total").increment(1);
            }
        }
    }
    Ok(out)
}

/// Conditional-GET client for the active alerts endpoint.
pub struct NwsClient {
    http: Client,
    endpoint: String,
    user_agent: String,
}

impl NwsClient {
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            user_agent: user_agent.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AlertFeed for NwsClient {
    async fn fetch(&self, point: &MonitoredPoint, state: &mut FetchState) -> Result<FetchOutcome> {
        let t0 = Instant::now();
        let mut req = self
            .http
            .get(&self.endpoint)
            .query(&[("point", point.coords.as_query())])
            .header(ACCEPT, ACCEPT_LD_JSON)
            .header(USER_AGENT, &self.user_agent);
        if let Some(validator) = state.validator.as_deref() {
            req = req.header(IF_MODIFIED_SINCE, validator);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("alerts request for {}", point.name))?;
        histogram!("fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let status = resp.status();
        if status.is_success() {
            let validator = resp
                .headers()
                .get(LAST_MODIFIED)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = resp
                .bytes()
                .await
                .with_context(|| format!("reading alerts body for {}", point.name))?;
            let alerts = parse_alert_list(&body)
                .with_context(|| format!("decoding alerts for {}", point.name))?;
            state.validator = validator;
            return Ok(FetchOutcome::Fresh(alerts));
        }

        match status {
            StatusCode::NOT_MODIFIED => Ok(FetchOutcome::NotModified),
            StatusCode::TOO_MANY_REQUESTS => Ok(FetchOutcome::RateLimited),
            _ => {
                let is_json = resp
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|ct| ct.contains("json"));
                let problem = if is_json {
                    resp.json::<Problem>().await.ok()
                } else {
                    None
                };
                Ok(FetchOutcome::UpstreamProblem {
                    status: status.as_u16(),
                    problem,
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "nws"
    }
}
