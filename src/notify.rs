//! Notification model and delivery seam.

use color_eyre::{eyre::eyre, Result};

/// Tag shared by app notifications so they replace instead of stack.
pub const DEFAULT_TAG: &str = "barakah-notification";
pub const ICON_PATH: &str = "/icons/icon-192x192.png";
pub const BADGE_PATH: &str = "/icons/badge-72x72.png";

/// An on-screen notification, shaped after the web notification options
/// the app has always used.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub vibrate: Vec<u32>,
  /// Click target, resolved against the app origin.
  pub url: String,
  /// Text direction, `rtl` for the Arabic interface.
  pub dir: String,
  pub lang: String,
  pub actions: Vec<NotificationAction>,
  /// Same-tag notifications replace each other.
  pub tag: String,
  /// Alert again even when replacing an existing notification.
  pub renotify: bool,
}

/// Action button offered on a notification.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct NotificationAction {
  pub action: String,
  pub title: String,
}

impl Notification {
  /// A notification with the app's fixed presentation: rtl Arabic, the
  /// standard icon and badge, replace-by-tag with renotify.
  pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      body: body.into(),
      icon: ICON_PATH.to_string(),
      badge: BADGE_PATH.to_string(),
      vibrate: vec![100, 50, 100],
      url: "/".to_string(),
      dir: "rtl".to_string(),
      lang: "ar".to_string(),
      actions: Vec::new(),
      tag: DEFAULT_TAG.to_string(),
      renotify: true,
    }
  }
}

/// Where notifications go. One implementation talks to the OS; tests and
/// quiet paths swap in their own.
pub trait NotificationSink: Send + Sync {
  /// Present the notification to the user.
  fn show(&self, notification: &Notification) -> Result<()>;
  /// Withdraw a previously shown notification, where the backend can.
  fn dismiss(&self, tag: &str);
}

/// Delivery through the desktop notification service.
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
  fn show(&self, notification: &Notification) -> Result<()> {
    let mut desktop = notify_rust::Notification::new();
    desktop
      .appname("barakah")
      .summary(&notification.title)
      .body(&notification.body)
      .icon(&notification.icon);
    for action in &notification.actions {
      desktop.action(&action.action, &action.title);
    }
    // Servers that understand stack tags collapse same-tag notifications.
    desktop.hint(notify_rust::Hint::Custom(
      "x-dunst-stack-tag".to_string(),
      notification.tag.clone(),
    ));
    desktop
      .show()
      .map(|_| ())
      .map_err(|e| eyre!("Failed to show desktop notification: {}", e))
  }

  fn dismiss(&self, _tag: &str) {
    // Desktop toasts expire on their own.
  }
}

/// Sink for paths that must stay quiet.
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
  fn show(&self, _notification: &Notification) -> Result<()> {
    Ok(())
  }

  fn dismiss(&self, _tag: &str) {}
}

#[cfg(test)]
pub mod testing {
  use super::*;
  use std::sync::Mutex;

  /// Sink that records everything it is asked to show or dismiss.
  #[derive(Default)]
  pub struct RecordingSink {
    shown: Mutex<Vec<Notification>>,
    dismissed: Mutex<Vec<String>>,
  }

  impl RecordingSink {
    pub fn new() -> Self {
      Self::default()
    }

    pub fn shown(&self) -> Vec<Notification> {
      self.shown.lock().unwrap().clone()
    }

    pub fn dismissed(&self) -> Vec<String> {
      self.dismissed.lock().unwrap().clone()
    }
  }

  impl NotificationSink for RecordingSink {
    fn show(&self, notification: &Notification) -> Result<()> {
      self.shown.lock().unwrap().push(notification.clone());
      Ok(())
    }

    fn dismiss(&self, tag: &str) {
      self.dismissed.lock().unwrap().push(tag.to_string());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_app_presentation() {
    let notification = Notification::new("نظام بركة", "إشعار جديد");
    assert_eq!(notification.dir, "rtl");
    assert_eq!(notification.lang, "ar");
    assert_eq!(notification.tag, DEFAULT_TAG);
    assert_eq!(notification.vibrate, vec![100, 50, 100]);
    assert_eq!(notification.url, "/");
    assert!(notification.renotify);
  }
}
