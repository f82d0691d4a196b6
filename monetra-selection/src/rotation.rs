use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::engine::SelectionEngine;

/// Periodic cache rotation task. The handle must be stopped explicitly;
/// dropping it without calling `stop` leaves the task running.
pub struct RotationScheduler {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RotationScheduler {
    pub fn start(engine: Arc<SelectionEngine>, every: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately, which
            // doubles as startup cache warming.
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match engine.rotate().await {
                            Ok(warmed) => info!(slices = warmed, "selection cache rotated"),
                            Err(err) => warn!(error = %err, "cache rotation failed, serving stale slices"),
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
        });
        Self { stop, handle }
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}
