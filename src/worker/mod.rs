//! The offline worker: cache lifecycle and event handling.
//!
//! Mirrors the browser worker the app runs on the web:
//! - Installation pre-caches the app shell, all or nothing
//! - Activation prunes caches left by earlier versions and claims windows
//! - Fetches route through per-request cache strategies
//! - Push payloads surface as on-screen notifications

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::notify::{Notification, NotificationSink};
use crate::store::{CachedResponse, Store};

mod clients;
mod fetch;
mod push;
mod router;

pub use clients::{ClientAction, ClientRegistry};
pub use fetch::{FetchRequest, HttpNetwork, Network, RequestMode};
pub use router::CacheRouter;

/// Version tag of the current cache generation. Bumping it makes the next
/// activation discard everything cached under older tags.
pub const CACHE_NAME: &str = "barakah-cache-v1";

/// The app shell, pre-cached during installation.
pub const STATIC_ASSETS: [&str; 3] = ["/", "/index.html", "/manifest.json"];

/// Background sync registration the worker acknowledges.
pub const SYNC_TRANSACTIONS: &str = "sync-transactions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Installing,
  Activated,
  Superseded,
}

/// The worker itself: owns the routing table, the window registry and the
/// notification sink, and moves through its lifecycle states.
pub struct ServiceWorker {
  state: WorkerState,
  origin: Url,
  store: Arc<Store>,
  network: Arc<dyn Network>,
  router: CacheRouter,
  clients: Arc<ClientRegistry>,
  sink: Arc<dyn NotificationSink>,
}

impl ServiceWorker {
  pub fn new(
    config: &Config,
    store: Arc<Store>,
    network: Arc<dyn Network>,
    clients: Arc<ClientRegistry>,
    sink: Arc<dyn NotificationSink>,
  ) -> Result<Self> {
    let origin = config.origin_url()?;
    let router = CacheRouter::new(
      store.clone(),
      network.clone(),
      CACHE_NAME.to_string(),
      config.backend_host()?,
      origin.clone(),
    );
    Ok(Self {
      state: WorkerState::Installing,
      origin,
      store,
      network,
      router,
      clients,
      sink,
    })
  }

  /// Pre-cache the app shell and activate.
  ///
  /// Every asset in [`STATIC_ASSETS`] must come back successful before
  /// anything is stored; a failed installation leaves earlier cache
  /// generations untouched and the worker in `Installing`. On success the
  /// worker activates immediately rather than waiting for old versions to
  /// wind down.
  pub async fn install(&mut self) -> Result<()> {
    if self.state != WorkerState::Installing {
      return Err(eyre!("Worker is already {:?}", self.state));
    }

    info!("Caching static assets");
    let mut shell = Vec::with_capacity(STATIC_ASSETS.len());
    for path in STATIC_ASSETS {
      let url = self
        .origin
        .join(path)
        .map_err(|e| eyre!("Invalid static asset path '{}': {}", path, e))?;
      let response = self
        .network
        .fetch(&FetchRequest::get(url.clone()))
        .await
        .map_err(|e| eyre!("Failed to pre-cache {}: {}", url, e))?;
      if !response.is_success() {
        return Err(eyre!("Failed to pre-cache {}: status {}", url, response.status));
      }
      shell.push((url, response));
    }

    for (url, response) in &shell {
      self.store.put_response(CACHE_NAME, url.as_str(), response)?;
    }

    self.activate()
  }

  /// Drop caches from earlier versions and take control of open windows.
  fn activate(&mut self) -> Result<()> {
    for name in self.store.prune_caches(CACHE_NAME)? {
      info!("Removed stale cache {}", name);
    }
    if let Some(previous) = self.clients.claim(CACHE_NAME)? {
      debug!("Worker {} replaces {}", CACHE_NAME, previous);
    }
    self.state = WorkerState::Activated;
    info!("Worker activated as {}", CACHE_NAME);
    Ok(())
  }

  /// Retire this worker. A superseded worker keeps its caches but serves
  /// nothing.
  pub fn supersede(&mut self) {
    self.state = WorkerState::Superseded;
    info!("Worker superseded");
  }

  /// Serve one request through the cache strategies. Only an activated
  /// worker serves.
  pub async fn handle_fetch(&self, request: &FetchRequest) -> Result<CachedResponse> {
    if self.state != WorkerState::Activated {
      return Err(eyre!("Worker is not active: {:?}", self.state));
    }
    self.router.route(request).await
  }

  /// Turn an incoming push message into a notification and show it.
  ///
  /// Pushes without a JSON payload are dropped. Returns the notification
  /// that was shown, if any.
  pub fn handle_push(&self, payload: Option<&str>) -> Result<Option<Notification>> {
    match push::notification_from_push(payload) {
      Some(notification) => {
        self.sink.show(&notification)?;
        Ok(Some(notification))
      }
      None => {
        debug!("Dropping push without a usable payload");
        Ok(None)
      }
    }
  }

  /// React to the user tapping a notification: dismiss it, then focus an
  /// open window of the app or open a new one on the target.
  pub fn handle_notification_click(&self, notification: &Notification) -> Result<ClientAction> {
    self.sink.dismiss(&notification.tag);
    let target = self
      .origin
      .join(&notification.url)
      .map_err(|e| eyre!("Invalid notification target '{}': {}", notification.url, e))?;
    self.clients.focus_or_open(&self.origin, target)
  }

  /// Acknowledge a background sync registration. The app keeps no offline
  /// mutation queue, so recognised tags are only logged.
  pub fn handle_background_sync(&self, tag: &str) -> bool {
    if tag == SYNC_TRANSACTIONS {
      info!("Syncing offline transactions");
      true
    } else {
      debug!("Ignoring unknown sync tag '{}'", tag);
      false
    }
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  pub fn clients(&self) -> &ClientRegistry {
    &self.clients
  }
}
