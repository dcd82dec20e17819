//! Signal handling for graceful shutdown and threshold reload.

use crate::config::ConfigLoader;
use pmon_core::config::{ConfigStore, ThresholdConfig};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Creates a future that completes when a shutdown signal is received.
///
/// Listens for SIGTERM and SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::error!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(sigint) => sigint,
        Err(e) => {
            tracing::error!("Failed to install SIGINT handler: {}", e);
            sigterm.recv().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
}

/// Spawns a task that reloads the trigger thresholds on SIGHUP.
///
/// The pipeline reads thresholds per batch, so a reload applies to the
/// next batch without a restart. Stops once `shutdown_rx` flips.
pub fn spawn_config_reload_handler(
    config_loader: Arc<ConfigLoader>,
    thresholds: ConfigStore<ThresholdConfig>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(sighup) => sighup,
            Err(e) => {
                tracing::error!("Failed to install SIGHUP handler, reload disabled: {}", e);
                return;
            }
        };

        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Config reload handler shutting down");
                        break;
                    }
                }
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading thresholds");
                    match config_loader.reload_thresholds() {
                        Ok(reloaded) => {
                            tracing::info!(
                                price_change = %reloaded.price_change_fraction,
                                high_value_transaction = %reloaded.high_value_transaction,
                                pnl = %reloaded.pnl_threshold,
                                "Thresholds reloaded"
                            );
                            thresholds.update(reloaded);
                        }
                        Err(e) => {
                            tracing::error!("Failed to reload configuration: {}", e);
                        }
                    }
                }
            }
        }
    })
}
