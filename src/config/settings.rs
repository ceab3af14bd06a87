// src/config/settings.rs
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::ingest::client::DEFAULT_ALERTS_ENDPOINT;
use crate::ingest::scheduler::PollerCfg;

/// Process configuration, read from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bot token for the output channel. `None` only in dry-run mode.
    pub discord_token: Option<String>,
    pub channel_id: u64,
    /// Contact fragment appended to the feed User-Agent.
    pub user_agent_contact: String,
    pub alerts_endpoint: String,
    pub request_interval: Duration,
    pub cycle_interval: Duration,
    pub http_timeout: Duration,
    pub restart_delay: Duration,
    pub max_failed_cycles: u32,
    /// Query server address; disabled when unset.
    pub http_bind: Option<SocketAddr>,
    pub console_relay: bool,
    pub dry_run: bool,
    pub log_json: bool,
}

fn env_parse_or<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = %raw, default = %default, "ignoring malformed env override");
            default
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let dry_run = env_flag("WEATHERBOY_DRY_RUN", false);

        let discord_token = std::env::var("DISCORD_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if discord_token.is_none() && !dry_run {
            return Err(anyhow!("Missing DISCORD_TOKEN env var"));
        }

        let channel_id = std::env::var("CHANNEL_ID")
            .map_err(|_| anyhow!("Missing CHANNEL_ID env var"))?
            .trim()
            .parse::<u64>()
            .context("CHANNEL_ID must be a numeric channel id")?;

        let http_bind = match std::env::var("HTTP_BIND") {
            Ok(v) if !v.trim().is_empty() => Some(
                v.trim()
                    .parse::<SocketAddr>()
                    .with_context(|| format!("HTTP_BIND {v:?} is not a socket address"))?,
            ),
            _ => None,
        };

        Ok(Self {
            discord_token,
            channel_id,
            user_agent_contact: std::env::var("NWS_USER_AGENT").unwrap_or_default(),
            alerts_endpoint: std::env::var("ALERTS_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ALERTS_ENDPOINT.to_string()),
            request_interval: Duration::from_secs(env_parse_or("REQUEST_INTERVAL_SECS", 6)),
            cycle_interval: Duration::from_secs(env_parse_or("CYCLE_INTERVAL_SECS", 10)),
            http_timeout: Duration::from_secs(env_parse_or::<u64>("HTTP_TIMEOUT_SECS", 10).max(1)),
            restart_delay: Duration::from_secs(env_parse_or("RESTART_DELAY_SECS", 5)),
            max_failed_cycles: env_parse_or::<u32>("MAX_FAILED_CYCLES", 3).max(1),
            http_bind,
            console_relay: env_flag("CONSOLE_RELAY", true),
            dry_run,
            log_json: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    pub fn poller_cfg(&self) -> PollerCfg {
        PollerCfg {
            request_interval: self.request_interval,
            cycle_interval: self.cycle_interval,
            max_failed_cycles: self.max_failed_cycles,
            restart_delay: self.restart_delay,
        }
    }
}
