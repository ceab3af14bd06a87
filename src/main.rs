//! Weatherboy binary entrypoint.
//! Loads configuration, then runs the supervised alert poller alongside the
//! console relay and the optional query server.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use weatherboy::api::{self, ApiState};
use weatherboy::config::Settings;
use weatherboy::ingest::client::{user_agent, NwsClient};
use weatherboy::ingest::config::load_locations_default;
use weatherboy::ingest::scheduler::{alert_board, supervise};
use weatherboy::notify::console::spawn_console_relay;
use weatherboy::notify::discord::DiscordNotifier;
use weatherboy::notify::{LogNotifier, Notifier};
use weatherboy::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let settings = Settings::from_env()?;
    telemetry::init_tracing(settings.log_json);

    let points = load_locations_default()?;
    let ua = user_agent(&settings.user_agent_contact);
    info!(
        user_agent = %ua,
        endpoint = %settings.alerts_endpoint,
        points = points.len(),
        dry_run = settings.dry_run,
        "weatherboy starting"
    );

    let prometheus = match telemetry::install_prometheus() {
        Ok(h) => Some(h),
        Err(e) => {
            warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let notifier: Arc<dyn Notifier> = match (&settings.discord_token, settings.dry_run) {
        (Some(token), false) => Arc::new(
            DiscordNotifier::new(settings.channel_id, token.clone())
                .with_timeout(settings.http_timeout),
        ),
        _ => Arc::new(LogNotifier),
    };

    let (board, alerts_rx) = alert_board();

    if settings.console_relay {
        spawn_console_relay(Arc::clone(&notifier));
    }

    if let Some(addr) = settings.http_bind {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding query server on {addr}"))?;
        let app = api::router(ApiState {
            alerts: alerts_rx,
            metrics: prometheus,
        });
        info!(%addr, "query server listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!(error = ?e, "query server stopped");
            }
        });
    }

    let build_feed = || {
        NwsClient::new(
            settings.alerts_endpoint.clone(),
            ua.clone(),
            settings.http_timeout,
        )
    };

    tokio::select! {
        res = supervise(build_feed, notifier, points, settings.poller_cfg(), board) => {
            let halted = res?;
            error!(point = %halted.point, "polling halted after upstream rate limit");
            bail!("rate limited by upstream while polling {}", halted.point)
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}
