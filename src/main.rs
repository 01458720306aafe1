//! Team Toss Back binary entrypoint wiring the REST, SSE and automation layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use team_toss_back::{
    config::AppConfig,
    dao::schedule_store::JsonFileScheduleStore,
    routes,
    services::{automation_service, scheduler},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let schedule_store = Arc::new(JsonFileScheduleStore::new(config.schedule_path()));
    info!(path = %schedule_store.path().display(), "using schedule store");

    let app_state = AppState::new(&config, schedule_store);
    automation_service::restore_schedule(&app_state).await;

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    scheduler::stop(&app_state).await;
    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
