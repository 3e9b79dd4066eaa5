//! Background hold sweeper — the one periodic task in the core.
//!
//! Buyers who abandon checkout never call release; the sweeper is the sole
//! guarantee their seats come back. It wakes on the configured interval,
//! asks the [`HoldManager`] to reclaim every lapsed hold, and exits cleanly
//! on the shutdown signal.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::holds::HoldManager;

/// Periodic expiry sweep over the hold table.
pub struct HoldSweeper {
    manager: Arc<HoldManager>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HoldSweeper {
    #[must_use]
    pub fn new(manager: Arc<HoldManager>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            manager,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start the sweep loop in the background. The interval comes from the
    /// manager's [`HoldConfig`]. Returns a handle that resolves once the
    /// loop exits after [`HoldSweeper::shutdown`].
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.manager.config().sweep_interval;
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "Hold sweeper started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Hold sweeper received shutdown signal");
                        break;
                    }
                    () = tokio::time::sleep(interval) => {
                        match self.manager.sweep_expired(Utc::now()) {
                            Ok(0) => {}
                            Ok(swept) => {
                                tracing::info!(seats = swept, "Sweep reclaimed expired holds");
                            }
                            Err(err) => {
                                tracing::error!(error = %err, "Sweep pass failed");
                            }
                        }
                    }
                }
            }
            tracing::info!("Hold sweeper stopped");
        })
    }

    /// Signal the sweep loop to exit. Safe to call more than once.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
