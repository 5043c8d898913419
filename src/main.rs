//! # Macro Stress Service — Binary Entrypoint
//! Boots the Axum HTTP server wiring the store, the source adapters, and the
//! telemetry exporter.
//!
//! ## Endpoints
//! - `GET /health` — liveness check
//! - `GET /metrics` — Prometheus exposition
//! - `GET /api/cron/daily` — authenticated scheduler trigger
//! - `GET /api/public/stress` — current scoreboard
//! - `GET /api/public/stress/:code/history` — 30-day country history
//!
//! ## Offline jobs
//! The backfill reducers and the normalization builder share this binary:
//! `macro-stress backfill <fx|inflation|sovereign|reserves|crypto|norms>`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use macro_stress::api::{create_router, ApiState};
use macro_stress::pipeline::{backfill, norms_builder};
use macro_stress::sources::{build_backfill_client, build_client, Sources};
use macro_stress::store::Store;
use macro_stress::telemetry::Telemetry;
use macro_stress::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config::from_env()?;
    let store = Store::connect(&cfg.database_url).await?;
    store.seed_countries().await?;

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("serve") => serve(cfg, store).await,
        Some("backfill") => {
            let sources = Sources::from_config(&cfg, build_backfill_client());
            match args.next().as_deref() {
                Some("fx") => backfill::backfill_fx(&store, &sources).await,
                Some("inflation") => backfill::backfill_inflation(&store, &sources).await,
                Some("sovereign") => backfill::backfill_sovereign(&store, &sources).await,
                Some("reserves") => backfill::backfill_reserves(&store, &sources).await,
                Some("crypto") => backfill::backfill_crypto(&store, &sources).await,
                Some("norms") => norms_builder::build_norms(&store).await,
                other => bail!("unknown backfill family: {other:?}"),
            }
        }
        Some(other) => bail!("unknown command: {other}"),
    }
}

async fn serve(cfg: Config, store: Store) -> Result<()> {
    let telemetry = Telemetry::init()?;
    let state = Arc::new(ApiState {
        store,
        sources: Sources::from_config(&cfg, build_client()),
        cron_secret: cfg.cron_shared_secret.clone(),
    });

    let app = create_router(state).merge(telemetry.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")
}
