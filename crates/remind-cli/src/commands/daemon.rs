use std::future::Future;
use std::path::Path;
use std::pin::pin;

use remind_core::config::SyncSettings;
use remind_core::sync::SyncCoordinator;

use crate::commands::common::{open_database, start_coordinator};
use crate::error::CliError;

/// Keep the coordinator running until Ctrl-C.
///
/// Starting counts as a foreground event. On Unix, `SIGUSR1` triggers another one.
pub async fn run_daemon(db_path: &Path, settings: &SyncSettings) -> Result<(), CliError> {
    let db = open_database(db_path).await?;
    let coordinator = start_coordinator(&db, settings)?;

    serve_until(&coordinator, settings, wait_for_stop(&coordinator)).await;
    coordinator.shutdown().await;
    tracing::info!("Sync daemon stopped");
    Ok(())
}

/// Announce (secondaries), flush after the settle delay, then reconcile on the
/// configured interval until `stop` resolves.
pub async fn serve_until(
    coordinator: &SyncCoordinator,
    settings: &SyncSettings,
    stop: impl Future<Output = ()>,
) {
    if !coordinator.role().is_primary() {
        let deliveries = coordinator.announce().await;
        tracing::info!(peers = deliveries.len(), "Announced to peers");
    }

    let foreground = coordinator.on_foreground();
    let ticker = settings
        .reconcile_interval()
        .map(|every| coordinator.spawn_periodic_reconcile(every));
    tracing::info!(
        role = settings.role.as_str(),
        reconcile_interval_secs = settings.reconcile_interval_secs,
        "Sync daemon running"
    );

    stop.await;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    if !foreground.is_finished() {
        foreground.abort();
    }
}

async fn wait_for_stop(coordinator: &SyncCoordinator) {
    let mut stop = pin!(tokio::signal::ctrl_c());

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::user_defined1()) {
            Ok(mut wake) => loop {
                tokio::select! {
                    result = &mut stop => {
                        log_signal_error(result);
                        return;
                    }
                    Some(()) = wake.recv() => {
                        tracing::info!("Foreground requested");
                        drop(coordinator.on_foreground());
                    }
                }
            },
            Err(error) => tracing::warn!(%error, "SIGUSR1 unavailable; only Ctrl-C is handled"),
        }
    }
    #[cfg(not(unix))]
    let _ = coordinator;

    log_signal_error(stop.await);
}

fn log_signal_error(result: std::io::Result<()>) {
    if let Err(error) = result {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
}
