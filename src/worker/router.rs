//! Request classification and the three caching strategies.

use std::sync::Arc;

use color_eyre::Result;
use reqwest::Method;
use tracing::{debug, warn};
use url::Url;

use super::fetch::{FetchRequest, Network, RequestMode};
use crate::store::{CachedResponse, Store};

/// Extensions treated as static assets.
const ASSET_EXTENSIONS: &[&str] = &["js", "css", "png", "jpg", "svg", "woff2"];

/// What a request gets routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Not intercepted: non-GET traffic and backend API calls.
  PassThrough,
  /// Navigations: network first, cached page second, cached root last.
  NetworkFirst,
  /// Static assets: cached copy immediately, refreshed in the background.
  CacheFirst,
  /// Everything else: network, falling back to the cache.
  NetworkWithCacheFallback,
}

/// Classification order is fixed: method, backend host, navigation,
/// asset extension, default.
pub fn classify(request: &FetchRequest, backend_host: &str) -> Strategy {
  if request.method != Method::GET {
    return Strategy::PassThrough;
  }
  if is_backend_host(request.url.host_str(), backend_host) {
    return Strategy::PassThrough;
  }
  if request.mode == RequestMode::Navigate {
    return Strategy::NetworkFirst;
  }
  if has_asset_extension(request.url.path()) {
    return Strategy::CacheFirst;
  }
  Strategy::NetworkWithCacheFallback
}

fn is_backend_host(host: Option<&str>, backend: &str) -> bool {
  match host {
    Some(host) => host == backend || host.ends_with(&format!(".{}", backend)),
    None => false,
  }
}

fn has_asset_extension(path: &str) -> bool {
  match path.rsplit_once('.') {
    Some((_, extension)) => ASSET_EXTENSIONS.contains(&extension),
    None => false,
  }
}

/// Runs requests through the strategy their classification selects,
/// against one named cache.
pub struct CacheRouter {
  store: Arc<Store>,
  network: Arc<dyn Network>,
  cache_name: String,
  backend_host: String,
  /// The app origin; its root document is the navigation fallback of last
  /// resort.
  root_url: Url,
}

impl CacheRouter {
  pub fn new(
    store: Arc<Store>,
    network: Arc<dyn Network>,
    cache_name: String,
    backend_host: String,
    root_url: Url,
  ) -> Self {
    Self {
      store,
      network,
      cache_name,
      backend_host,
      root_url,
    }
  }

  pub fn classify(&self, request: &FetchRequest) -> Strategy {
    classify(request, &self.backend_host)
  }

  /// Serve one request through its strategy.
  pub async fn route(&self, request: &FetchRequest) -> Result<CachedResponse> {
    match self.classify(request) {
      Strategy::PassThrough => self.network.fetch(request).await,
      Strategy::NetworkFirst => self.network_first(request).await,
      Strategy::CacheFirst => self.cache_first(request).await,
      Strategy::NetworkWithCacheFallback => self.network_with_cache_fallback(request).await,
    }
  }

  async fn network_first(&self, request: &FetchRequest) -> Result<CachedResponse> {
    match self.fetch_and_store(request).await {
      Ok(response) => Ok(response),
      Err(err) => {
        if let Some(cached) = self.store.match_response(&self.cache_name, request.url.as_str())? {
          debug!("Serving cached page for {}", request.url);
          return Ok(cached);
        }
        if let Some(root) = self.store.match_response(&self.cache_name, self.root_url.as_str())? {
          debug!("Serving cached root document for {}", request.url);
          return Ok(root);
        }
        Err(err)
      }
    }
  }

  async fn cache_first(&self, request: &FetchRequest) -> Result<CachedResponse> {
    if let Some(cached) = self.store.match_response(&self.cache_name, request.url.as_str())? {
      self.spawn_revalidate(request);
      return Ok(cached);
    }
    self.fetch_and_store(request).await
  }

  async fn network_with_cache_fallback(&self, request: &FetchRequest) -> Result<CachedResponse> {
    match self.fetch_and_store(request).await {
      Ok(response) => Ok(response),
      Err(err) => match self.store.match_response(&self.cache_name, request.url.as_str())? {
        Some(cached) => {
          debug!("Serving cached copy for {}", request.url);
          Ok(cached)
        }
        None => Err(err),
      },
    }
  }

  /// Fetch and capture into the cache. Responses are cached regardless of
  /// status; error pages count as representations too.
  async fn fetch_and_store(&self, request: &FetchRequest) -> Result<CachedResponse> {
    let response = self.network.fetch(request).await?;
    self
      .store
      .put_response(&self.cache_name, request.url.as_str(), &response)?;
    Ok(response)
  }

  /// Refresh a served-from-cache entry without making the caller wait.
  fn spawn_revalidate(&self, request: &FetchRequest) {
    let network = Arc::clone(&self.network);
    let store = Arc::clone(&self.store);
    let cache_name = self.cache_name.clone();
    let request = request.clone();
    tokio::spawn(async move {
      match network.fetch(&request).await {
        Ok(response) => {
          if let Err(err) = store.put_response(&cache_name, request.url.as_str(), &response) {
            warn!("Failed to refresh cached asset {}: {}", request.url, err);
          }
        }
        Err(err) => debug!("Background refresh of {} failed: {}", request.url, err),
      }
    });
  }
}
