//! remind-tv - receives reminder snapshots and deletes from the phone
//!
//! Serves `GET /status`, `POST /sync` and `POST /delete_recordatorio` and keeps
//! its own libSQL copy of the list.

mod config;
mod error;
mod routes;

use remind_core::services::DatabaseService;
use remind_core::transport::MdnsAdvertiser;

use config::AppConfig;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("remind_tv=info".parse().expect("valid directive"))
                .add_directive("remind_core=info".parse().expect("valid directive")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "Starting remind-tv");

    let db = DatabaseService::open_path(config.db_path.clone()).await?;
    let instance = config
        .mdns
        .as_ref()
        .map_or_else(|| "remind-tv".to_string(), |mdns| mdns.instance_name.clone());
    let state = AppState::new(db, instance);

    let _advertiser = match &config.mdns {
        Some(mdns) => Some(MdnsAdvertiser::register(
            &mdns.instance_name,
            mdns.ip,
            mdns.port,
        )?),
        None => None,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(bind_addr = %config.bind_addr, "remind-tv listening");
    axum::serve(listener, app_router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    tracing::info!("remind-tv stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}
