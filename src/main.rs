//! Arena ladder backend binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod ladder;
mod provider;
mod routes;
mod services;
mod state;

use config::AppConfig;
use provider::http::HttpMatchProvider;
use services::{ladder_service, poller, scoring};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let provider = Arc::new(
        HttpMatchProvider::new(&config.provider_base_url, &config.provider_api_key)
            .context("building match provider client")?,
    );
    let app_state = AppState::new(config, provider, scoring::unchanged_policy());

    spawn_storage(app_state.clone()).await;
    ladder_service::load_ladder(&app_state).await;
    poller::start(&app_state).await;

    let app = build_router(app_state);

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

    Ok(())
}

/// Spawn the MongoDB supervisor, which keeps retrying in the background and
/// toggles degraded mode as connectivity changes.
#[cfg(feature = "mongo-store")]
async fn spawn_storage(state: state::SharedState) {
    use crate::dao::{
        mongodb::{MongoConfig, MongoRecordStore},
        record_store::RecordStore,
        storage::StorageError,
    };
    use crate::services::storage_supervisor;

    let mongo_uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let mongo_db = env::var("MONGO_DB").ok();

    tokio::spawn(storage_supervisor::run(state, move || {
        let uri = mongo_uri.clone();
        let db = mongo_db.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db.as_deref())
                .await
                .map_err(|err| StorageError::unavailable("parsing MongoDB URI".into(), err))?;
            let store = MongoRecordStore::connect(config)
                .await
                .map_err(|err| StorageError::unavailable("connecting to MongoDB".into(), err))?;
            Ok(Arc::new(store) as Arc<dyn RecordStore>)
        }
    }));
}

/// Install the in-memory record store when no database backend is compiled in.
#[cfg(not(feature = "mongo-store"))]
async fn spawn_storage(state: state::SharedState) {
    use crate::dao::memory::MemoryRecordStore;

    state
        .install_record_store(Arc::new(MemoryRecordStore::new()))
        .await;
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
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
