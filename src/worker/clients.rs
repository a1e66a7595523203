//! Registry of open client windows the worker governs.

use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use url::Url;

/// One open window of the app.
#[derive(Debug, Clone)]
pub struct ClientWindow {
  pub id: u64,
  pub url: Url,
  pub focused: bool,
}

/// What a notification click did with the windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAction {
  Focused(u64),
  Opened(u64),
}

/// Window list plus the version tag of the worker controlling them.
pub struct ClientRegistry {
  windows: Mutex<Vec<ClientWindow>>,
  controller: Mutex<Option<String>>,
  next_id: AtomicU64,
}

impl ClientRegistry {
  pub fn new() -> Self {
    Self {
      windows: Mutex::new(Vec::new()),
      controller: Mutex::new(None),
      next_id: AtomicU64::new(1),
    }
  }

  /// Open a fresh focused window on `url`.
  pub fn open_window(&self, url: Url) -> Result<u64> {
    let mut windows = self.lock_windows()?;
    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
    for window in windows.iter_mut() {
      window.focused = false;
    }
    windows.push(ClientWindow {
      id,
      url,
      focused: true,
    });
    Ok(id)
  }

  /// Take control of every window; returns the previous controller.
  pub fn claim(&self, version: &str) -> Result<Option<String>> {
    let mut controller = self
      .controller
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(controller.replace(version.to_string()))
  }

  /// Navigate and focus the first window on `origin`, or open a new one
  /// on `target`.
  pub fn focus_or_open(&self, origin: &Url, target: Url) -> Result<ClientAction> {
    let mut windows = self.lock_windows()?;
    let found = windows
      .iter()
      .position(|window| window.url.origin() == origin.origin());
    match found {
      Some(index) => {
        for (i, window) in windows.iter_mut().enumerate() {
          window.focused = i == index;
        }
        let window = &mut windows[index];
        window.url = target;
        Ok(ClientAction::Focused(window.id))
      }
      None => {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        for window in windows.iter_mut() {
          window.focused = false;
        }
        windows.push(ClientWindow {
          id,
          url: target,
          focused: true,
        });
        Ok(ClientAction::Opened(id))
      }
    }
  }

  /// Snapshot of the current windows.
  pub fn windows(&self) -> Result<Vec<ClientWindow>> {
    Ok(self.lock_windows()?.clone())
  }

  fn lock_windows(&self) -> Result<std::sync::MutexGuard<'_, Vec<ClientWindow>>> {
    self.windows.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }
}

impl Default for ClientRegistry {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
  }

  #[test]
  fn test_focus_or_open_prefers_first_matching_window() {
    let registry = ClientRegistry::new();
    let elsewhere = registry.open_window(url("https://other.example/page")).unwrap();
    let first = registry.open_window(url("https://barakah.app/dashboard")).unwrap();
    let second = registry.open_window(url("https://barakah.app/finance")).unwrap();

    let origin = url("https://barakah.app/");
    let action = registry
      .focus_or_open(&origin, url("https://barakah.app/tasks"))
      .unwrap();
    assert_eq!(action, ClientAction::Focused(first));

    let windows = registry.windows().unwrap();
    let focused = windows.iter().find(|w| w.id == first).unwrap();
    assert_eq!(focused.url.as_str(), "https://barakah.app/tasks");
    assert!(focused.focused);
    assert!(!windows.iter().find(|w| w.id == second).unwrap().focused);
    assert!(!windows.iter().find(|w| w.id == elsewhere).unwrap().focused);
  }

  #[test]
  fn test_focus_or_open_opens_when_no_window_matches() {
    let registry = ClientRegistry::new();
    registry.open_window(url("https://other.example/page")).unwrap();

    let origin = url("https://barakah.app/");
    let action = registry
      .focus_or_open(&origin, url("https://barakah.app/"))
      .unwrap();
    let ClientAction::Opened(id) = action else {
      panic!("expected a new window, got {:?}", action);
    };

    let windows = registry.windows().unwrap();
    assert_eq!(windows.len(), 2);
    let opened = windows.iter().find(|w| w.id == id).unwrap();
    assert_eq!(opened.url.as_str(), "https://barakah.app/");
    assert!(opened.focused);
  }

  #[test]
  fn test_claim_replaces_controller() {
    let registry = ClientRegistry::new();
    assert_eq!(registry.claim("barakah-cache-v1").unwrap(), None);
    assert_eq!(
      registry.claim("barakah-cache-v2").unwrap(),
      Some("barakah-cache-v1".to_string())
    );
  }
}
