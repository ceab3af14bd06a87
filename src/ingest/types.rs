// src/ingest/types.rs
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Latitude/longitude pair used as the feed query key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Parse `"lat,lon"` (whitespace around either part is ignored).
    pub fn parse(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("point {s:?} is not in `lat,lon` form"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .with_context(|| format!("latitude in {s:?}"))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .with_context(|| format!("longitude in {s:?}"))?;
        if !(-90.0..=90.0).contains(&lat) {
            bail!("latitude {lat} out of range");
        }
        if !(-180.0..=180.0).contains(&lon) {
            bail!("longitude {lon} out of range");
        }
        Ok(Self { lat, lon })
    }

    /// Query value for `?point=`. The feed redirects anything finer than 4 decimals.
    pub fn as_query(&self) -> String {
        format!("{:.4},{:.4}", self.lat, self.lon)
    }
}

/// One location under surveillance. Static for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredPoint {
    pub name: String,
    pub coords: Coordinates,
}

impl MonitoredPoint {
    pub fn new(name: impl Into<String>, coords: Coordinates) -> Self {
        Self {
            name: name.into(),
            coords,
        }
    }
}

/// Per-point conditional-fetch state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchState {
    /// `Last-Modified` of the last successful fetch, replayed as `If-Modified-Since`.
    pub validator: Option<String>,
}

/// Alert as delivered by the feed, before classification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawAlert {
    pub id: String,
    pub event: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub expires: DateTime<Utc>,
    #[serde(rename = "messageType", default, deserialize_with = "null_as_default")]
    pub message_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Problem-details body attached to error-class responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Problem {
    pub title: Option<String>,
    pub status: Option<u16>,
    pub detail: Option<String>,
}

/// Closed set of non-transport results of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// New alert list; the point's validator has been refreshed.
    Fresh(Vec<RawAlert>),
    /// Upstream answered "unchanged" for the replayed validator.
    NotModified,
    /// Error-class response other than rate limiting.
    UpstreamProblem {
        status: u16,
        problem: Option<Problem>,
    },
    /// Upstream says we are polling too hard. Fatal for the poller.
    RateLimited,
}

impl FetchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Fresh(_) => "fresh",
            FetchOutcome::NotModified => "not_modified",
            FetchOutcome::UpstreamProblem { .. } => "upstream_problem",
            FetchOutcome::RateLimited => "rate_limited",
        }
    }
}

/// Source of raw alerts for one point. An `Err` is always a transient transport failure.
#[async_trait::async_trait]
pub trait AlertFeed: Send + Sync {
    async fn fetch(&self, point: &MonitoredPoint, state: &mut FetchState) -> Result<FetchOutcome>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
impl<T: AlertFeed + ?Sized> AlertFeed for std::sync::Arc<T> {
    async fn fetch(&self, point: &MonitoredPoint, state: &mut FetchState) -> Result<FetchOutcome> {
        (**self).fetch(point, state).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
