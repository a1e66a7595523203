//! The headless agent: an installed worker plus scheduled syncing, run
//! until interrupted.

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::info;

use crate::prayer::{format_countdown, minutes_until, next_prayer, now_minutes};
use crate::store::Store;
use crate::sync::SyncCoordinator;
use crate::worker::ServiceWorker;

pub struct Agent {
  store: Arc<Store>,
  worker: ServiceWorker,
  coordinator: Arc<SyncCoordinator>,
}

impl Agent {
  pub fn new(store: Arc<Store>, worker: ServiceWorker, coordinator: Arc<SyncCoordinator>) -> Self {
    Self {
      store,
      worker,
      coordinator,
    }
  }

  /// Install the worker, restore scheduled syncing, then idle until
  /// ctrl-c. Shutdown supersedes the worker but leaves its caches and
  /// settings for the next run.
  pub async fn run(&mut self) -> Result<()> {
    self.worker.install().await?;
    info!("Worker state: {:?}", self.worker.state());

    if self.coordinator.restore_auto_sync().await? {
      info!("Auto sync restored from saved settings");
    }

    if let Some(schedule) = self.store.prayer_schedule()? {
      let now = now_minutes();
      if let Some(next) = next_prayer(&schedule, now) {
        info!(
          "Next prayer {} at {} ({} left)",
          next.prayer.name_ar(),
          next.time,
          format_countdown(minutes_until(&next, now))
        );
      }
    }

    info!("Agent running; press ctrl-c to stop");
    tokio::signal::ctrl_c()
      .await
      .map_err(|e| eyre!("Failed to listen for shutdown signal: {}", e))?;

    self.coordinator.stop().await;
    self.worker.supersede();
    info!("Agent stopped");
    Ok(())
  }
}
