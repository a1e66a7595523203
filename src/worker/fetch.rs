//! Request model and the transport seam the routing strategies run on.

use async_trait::async_trait;
use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use url::Url;

use crate::store::CachedResponse;

/// How the intercepted request entered the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
  /// Top-level page load.
  Navigate,
  /// Script, style, image or data request issued by a page.
  Subresource,
}

/// An intercepted request, reduced to what routing needs.
#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub method: Method,
  pub url: Url,
  pub mode: RequestMode,
}

impl FetchRequest {
  pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
    Self { method, url, mode }
  }

  /// A subresource GET.
  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url, RequestMode::Subresource)
  }

  /// A top-level navigation GET.
  pub fn navigate(url: Url) -> Self {
    Self::new(Method::GET, url, RequestMode::Navigate)
  }
}

/// Transport behind the strategies; tests script it, the binary uses HTTP.
#[async_trait]
pub trait Network: Send + Sync {
  /// Perform the request against the origin server and capture the
  /// response in full.
  async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse>;
}

/// reqwest-backed transport.
pub struct HttpNetwork {
  client: reqwest::Client,
}

impl HttpNetwork {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(std::time::Duration::from_secs(30))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Network for HttpNetwork {
  async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse> {
    let response = self
      .client
      .request(request.method.clone(), request.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;
    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response body from {}: {}", request.url, e))?
      .to_vec();
    Ok(CachedResponse {
      status,
      headers,
      body,
      stored_at: Utc::now(),
    })
  }
}

#[cfg(test)]
pub mod testing {
  use super::*;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Mutex;

  /// A scripted origin server.
  pub struct StubNetwork {
    responses: Mutex<HashMap<String, CachedResponse>>,
    offline: AtomicBool,
    log: Mutex<Vec<String>>,
  }

  impl StubNetwork {
    pub fn new() -> Self {
      Self {
        responses: Mutex::new(HashMap::new()),
        offline: AtomicBool::new(false),
        log: Mutex::new(Vec::new()),
      }
    }

    pub fn insert(&self, url: &str, response: CachedResponse) {
      self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
      self.offline.store(offline, Ordering::Relaxed);
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
      self.log.lock().unwrap().clone()
    }
  }

  #[async_trait]
  impl Network for StubNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<CachedResponse> {
      if self.offline.load(Ordering::Relaxed) {
        return Err(eyre!("network unreachable"));
      }
      self.log.lock().unwrap().push(request.url.to_string());
      self
        .responses
        .lock()
        .unwrap()
        .get(request.url.as_str())
        .cloned()
        .ok_or_else(|| eyre!("no response scripted for {}", request.url))
    }
  }

  /// Plain 200 response with the given body.
  pub fn response(body: &str) -> CachedResponse {
    CachedResponse {
      status: 200,
      headers: Vec::new(),
      body: body.as_bytes().to_vec(),
      stored_at: Utc::now(),
    }
  }

  /// Response with an explicit status code.
  pub fn response_with_status(status: u16, body: &str) -> CachedResponse {
    CachedResponse {
      status,
      body: body.as_bytes().to_vec(),
      headers: Vec::new(),
      stored_at: Utc::now(),
    }
  }
}
