//! Sync orchestration: single-flight coalescing, outcome surfacing and
//! the auto-sync timer.

use chrono::Utc;
use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::cloud::{RemoteSync, SyncOutcome, MSG_SYNC_FAILED};
use crate::notify::{Notification, NotificationSink};
use crate::store::Store;

/// Default period between automatic syncs.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy)]
enum SyncOp {
  Sync,
  Pull,
}

impl SyncOp {
  fn title(self, success: bool) -> &'static str {
    match (self, success) {
      (SyncOp::Sync, true) => "✅ تمت المزامنة",
      (SyncOp::Sync, false) => "❌ فشلت المزامنة",
      (SyncOp::Pull, true) => "✅ تم السحب",
      (SyncOp::Pull, false) => "❌ فشل السحب",
    }
  }
}

/// Slot holding the sender of the in-flight sync.
type InFlightSlot = std::sync::Mutex<Option<broadcast::Sender<SyncOutcome>>>;

/// Decides when syncs run. Explicit requests coalesce into one in-flight
/// attempt whose outcome every caller shares; an optional timer repeats
/// silent syncs while auto sync is enabled.
pub struct SyncCoordinator {
  remote: Arc<dyn RemoteSync>,
  store: Arc<Store>,
  sink: Arc<dyn NotificationSink>,
  interval: Duration,
  /// Broadcast slot of the in-flight sync, if any. A std mutex locked
  /// only outside await points, so `SlotRelease` can clear it from
  /// `Drop`.
  in_flight: InFlightSlot,
  timer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncCoordinator {
  pub fn new(
    remote: Arc<dyn RemoteSync>,
    store: Arc<Store>,
    sink: Arc<dyn NotificationSink>,
  ) -> Self {
    Self {
      remote,
      store,
      sink,
      interval: SYNC_INTERVAL,
      in_flight: std::sync::Mutex::new(None),
      timer: Mutex::new(None),
    }
  }

  /// Set the period of the auto-sync timer.
  pub fn with_interval(mut self, interval: Duration) -> Self {
    self.interval = interval;
    self
  }

  /// Run a sync, or join the one already running. `silent` suppresses
  /// this caller's result notification; the log line always happens.
  pub async fn sync_now(&self, silent: bool) -> SyncOutcome {
    let outcome = self.sync_shared().await;
    self.surface(SyncOp::Sync, &outcome, silent);
    outcome
  }

  /// Pull the cloud copy over the local one. Pulls are explicit and rare,
  /// so they run outside the single-flight slot.
  pub async fn pull_data(&self, silent: bool) -> SyncOutcome {
    let outcome = match self.remote.pull_all().await {
      Ok(outcome) => outcome,
      Err(err) => SyncOutcome::failure(err.to_string()),
    };
    let outcome = self.mark_synced(outcome);
    self.surface(SyncOp::Pull, &outcome, silent);
    outcome
  }

  /// Persist the auto-sync flag and apply it. Enabling runs one silent
  /// sync right away and arms the timer; disabling tears the timer down.
  /// Returns the immediate sync's outcome when enabling.
  pub async fn toggle_auto_sync(self: &Arc<Self>, enabled: bool) -> Result<Option<SyncOutcome>> {
    self.store.set_auto_sync_enabled(enabled)?;
    self.disarm_timer().await;

    if !enabled {
      info!("Auto sync disabled");
      return Ok(None);
    }

    info!("Auto sync enabled, every {:?}", self.interval);
    let outcome = self.sync_now(true).await;
    self.arm_timer().await;
    Ok(Some(outcome))
  }

  /// Re-arm the timer from the persisted flag. Unlike a toggle this does
  /// not sync immediately; the first run waits a full period. Returns
  /// whether auto sync is on.
  pub async fn restore_auto_sync(self: &Arc<Self>) -> Result<bool> {
    if !self.store.auto_sync_enabled()? {
      return Ok(false);
    }
    self.arm_timer().await;
    Ok(true)
  }

  /// Stop background work, for shutdown. The persisted flag is left as
  /// it is.
  pub async fn stop(&self) {
    self.disarm_timer().await;
  }

  async fn sync_shared(&self) -> SyncOutcome {
    let receiver = {
      let mut in_flight = lock_slot(&self.in_flight);
      match in_flight.as_ref() {
        Some(sender) => Some(sender.subscribe()),
        None => {
          let (sender, _) = broadcast::channel(1);
          *in_flight = Some(sender);
          None
        }
      }
    };

    if let Some(mut receiver) = receiver {
      return receiver
        .recv()
        .await
        .unwrap_or_else(|_| SyncOutcome::failure(MSG_SYNC_FAILED));
    }

    let release = SlotRelease::new(&self.in_flight);
    let outcome = self.attempt_sync().await;

    // Free the slot before broadcasting so a caller arriving now starts
    // a fresh sync instead of joining a finished one.
    if let Some(sender) = release.release() {
      let _ = sender.send(outcome.clone());
    }
    outcome
  }

  async fn attempt_sync(&self) -> SyncOutcome {
    let outcome = match self.remote.sync_all().await {
      Ok(outcome) => outcome,
      Err(err) => SyncOutcome::failure(err.to_string()),
    };
    self.mark_synced(outcome)
  }

  /// Successful outcomes also advance the persisted lastSync stamp.
  fn mark_synced(&self, outcome: SyncOutcome) -> SyncOutcome {
    if !outcome.success {
      return outcome;
    }
    match self.store.set_last_sync(Utc::now()) {
      Ok(()) => outcome,
      Err(err) => SyncOutcome::failure(format!("Failed to record sync time: {}", err)),
    }
  }

  fn surface(&self, op: SyncOp, outcome: &SyncOutcome, silent: bool) {
    if outcome.success {
      info!("{}", outcome.message);
    } else {
      warn!("{}", outcome.message);
    }
    if silent {
      return;
    }
    let notification = Notification::new(op.title(outcome.success), outcome.message.clone());
    if let Err(err) = self.sink.show(&notification) {
      warn!("Failed to show sync notification: {}", err);
    }
  }

  /// The timer holds a weak handle so an armed coordinator can still be
  /// dropped; the task winds down on the next tick.
  async fn arm_timer(self: &Arc<Self>) {
    let coordinator = Arc::downgrade(self);
    let period = self.interval;

    let handle = tokio::spawn(async move {
      let mut ticker = interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      // The first tick fires immediately; the enabling sync already ran.
      ticker.tick().await;
      loop {
        ticker.tick().await;
        match coordinator.upgrade() {
          Some(coordinator) => {
            coordinator.sync_now(true).await;
          }
          None => break,
        }
      }
    });

    if let Some(previous) = self.timer.lock().await.replace(handle) {
      previous.abort();
    }
  }

  async fn disarm_timer(&self) {
    if let Some(handle) = self.timer.lock().await.take() {
      handle.abort();
    }
  }
}

/// Releases the in-flight slot exactly once: taken on the completion
/// path, or cleared from `Drop` when a cancelled runner never reaches
/// it. Dropping the sender wakes joiners with a closed channel and they
/// surface the generic failure instead of waiting forever.
struct SlotRelease<'a> {
  slot: &'a InFlightSlot,
  armed: bool,
}

impl<'a> SlotRelease<'a> {
  fn new(slot: &'a InFlightSlot) -> Self {
    Self { slot, armed: true }
  }

  /// Take the sender out for broadcasting; joiners already subscribed
  /// to it still receive the outcome.
  fn release(mut self) -> Option<broadcast::Sender<SyncOutcome>> {
    self.armed = false;
    lock_slot(self.slot).take()
  }
}

impl Drop for SlotRelease<'_> {
  fn drop(&mut self) {
    if self.armed {
      lock_slot(self.slot).take();
    }
  }
}

/// Held only over non-await sections; a poisoned lock still holds a
/// usable value.
fn lock_slot(
  slot: &InFlightSlot,
) -> std::sync::MutexGuard<'_, Option<broadcast::Sender<SyncOutcome>>> {
  slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
